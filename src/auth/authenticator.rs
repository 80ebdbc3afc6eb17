//! Bearer credential verification and scoped token issuance.

use std::net::IpAddr;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::{AuthError, Capabilities, LoginKeys, Principal};
use crate::db::utils::{current_timestamp, parse_timestamp};
use crate::db::{
    ApiToken, Database, DbError, TokenPermissions, TokenRepository, User, UserRepository,
};

/// Prefix identifying scoped API tokens.
pub const TOKEN_PREFIX: &str = "pat_";

/// Maximum number of API tokens a single user may hold.
pub const MAX_TOKENS_PER_USER: i64 = 10;

const TOKEN_RANDOM_BYTES: usize = 24;
const DISPLAY_PREFIX_LEN: usize = 12;

/// SHA-256 hex digest of a raw token. Only this value is ever stored.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a raw token: `pat_<first 4 chars of user id>_<32 url-safe chars>`.
pub fn generate_token(user_id: &str) -> String {
    let mut bytes = [0u8; TOKEN_RANDOM_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let owner: String = user_id.chars().take(4).collect();
    format!("{TOKEN_PREFIX}{owner}_{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// The displayable part of a raw token.
pub fn display_prefix(raw: &str) -> String {
    let head: String = raw.chars().take(DISPLAY_PREFIX_LEN).collect();
    format!("{head}...")
}

/// A freshly issued token. `raw` is shown once and never stored.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub raw: String,
    pub record: ApiToken,
}

/// Turns bearer credentials into principals.
///
/// Cheap to clone; shares the database handle.
pub struct Authenticator<D: Database> {
    db: Arc<D>,
    login: Option<LoginKeys>,
}

impl<D: Database> Clone for Authenticator<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            login: self.login.clone(),
        }
    }
}

impl<D: Database + 'static> Authenticator<D> {
    pub fn new(db: Arc<D>, login: Option<LoginKeys>) -> Self {
        Self { db, login }
    }

    pub fn login_keys(&self) -> Option<&LoginKeys> {
        self.login.as_ref()
    }

    /// Verify a bearer credential.
    ///
    /// Scoped tokens are checked for existence, then revocation, then expiry,
    /// then the owner's account state. A successful scoped check records the
    /// use in a detached task.
    pub async fn authenticate(
        &self,
        bearer: Option<&str>,
        origin: Option<IpAddr>,
    ) -> Result<Principal, AuthError> {
        let token = bearer.map(str::trim).filter(|t| !t.is_empty());
        let Some(token) = token else {
            return Err(AuthError::Missing);
        };

        if token.starts_with(TOKEN_PREFIX) {
            self.authenticate_scoped(token, origin).await
        } else {
            self.authenticate_login(token).await
        }
    }

    async fn authenticate_scoped(
        &self,
        token: &str,
        origin: Option<IpAddr>,
    ) -> Result<Principal, AuthError> {
        let record = self
            .db
            .tokens()
            .find_by_hash(&hash_token(token))
            .await?
            .ok_or(AuthError::Invalid)?;

        if !record.is_active {
            return Err(AuthError::Revoked);
        }

        if let Some(expires_at) = &record.expires_at {
            // An unreadable expiry is treated as already past.
            let expired = parse_timestamp(expires_at).is_none_or(|at| at <= Utc::now());
            if expired {
                return Err(AuthError::Expired);
            }
        }

        let user = self.find_user(&record.user_id).await?;
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        self.record_use(record.id.clone(), origin);

        debug!(user = %user.username, token = %record.id, "Scoped token accepted");
        Ok(Principal {
            user_id: user.id,
            username: user.username,
            is_active: user.is_active,
            capabilities: Capabilities::Scoped(record.permissions),
            token_id: Some(record.id),
        })
    }

    async fn authenticate_login(&self, token: &str) -> Result<Principal, AuthError> {
        let Some(keys) = &self.login else {
            return Err(AuthError::Invalid);
        };
        let claims = keys.verify(token)?;

        let user = self.find_user(&claims.user_id).await?;
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        Ok(Principal {
            user_id: user.id,
            username: user.username,
            is_active: user.is_active,
            capabilities: Capabilities::Full,
            token_id: None,
        })
    }

    async fn find_user(&self, user_id: &str) -> Result<User, AuthError> {
        match self.db.users().get(user_id).await {
            Ok(user) => Ok(user),
            Err(DbError::NotFound { .. }) => Err(AuthError::Invalid),
            Err(e) => Err(e.into()),
        }
    }

    fn record_use(&self, token_id: String, origin: Option<IpAddr>) {
        let db = Arc::clone(&self.db);
        tokio::spawn(async move {
            let ip = origin.map(|ip| ip.to_string());
            if let Err(e) = db
                .tokens()
                .touch(&token_id, &current_timestamp(), ip.as_deref())
                .await
            {
                warn!(token = %token_id, error = %e, "Failed to record token use");
            }
        });
    }

    /// Issue a new scoped token for a user.
    pub async fn issue_token(
        &self,
        user_id: &str,
        name: &str,
        permissions: TokenPermissions,
        expires_at: Option<String>,
    ) -> Result<IssuedToken, AuthError> {
        let tokens = self.db.tokens();
        if tokens.count_by_user(user_id).await? >= MAX_TOKENS_PER_USER {
            return Err(AuthError::TokenLimit {
                max: MAX_TOKENS_PER_USER,
            });
        }

        let raw = generate_token(user_id);
        let record = tokens
            .create(&ApiToken {
                id: String::new(),
                user_id: user_id.to_string(),
                name: name.to_string(),
                token_hash: hash_token(&raw),
                token_prefix: display_prefix(&raw),
                permissions,
                is_active: true,
                expires_at,
                last_used_at: None,
                last_used_ip: None,
                created_at: String::new(),
            })
            .await?;

        Ok(IssuedToken { raw, record })
    }
}
