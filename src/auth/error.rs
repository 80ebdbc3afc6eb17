use axum::http::StatusCode;
use miette::Diagnostic;
use thiserror::Error;

use crate::db::DbError;

/// Credential verification and issuance failures.
#[derive(Error, Diagnostic, Debug)]
pub enum AuthError {
    #[error("Authentication token required")]
    #[diagnostic(code(taskhub::auth::missing))]
    Missing,

    #[error("Invalid authentication token")]
    #[diagnostic(code(taskhub::auth::invalid))]
    Invalid,

    #[error("API token has been revoked")]
    #[diagnostic(code(taskhub::auth::revoked))]
    Revoked,

    #[error("Authentication token has expired")]
    #[diagnostic(code(taskhub::auth::expired))]
    Expired,

    #[error("User account is disabled")]
    #[diagnostic(code(taskhub::auth::account_disabled))]
    AccountDisabled,

    #[error("Token limit reached: at most {max} API tokens per user")]
    #[diagnostic(
        code(taskhub::auth::token_limit),
        help("Revoke an unused token first")
    )]
    TokenLimit { max: i64 },

    #[error("Login tokens are disabled")]
    #[diagnostic(
        code(taskhub::auth::login_disabled),
        help("Set TASKHUB_JWT_SECRET to enable login tokens")
    )]
    LoginDisabled,

    #[error("Failed to sign login token: {0}")]
    #[diagnostic(code(taskhub::auth::signing))]
    Signing(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Storage(#[from] DbError),
}

impl AuthError {
    /// HTTP status a transport answers with when this error ends a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Missing | AuthError::Invalid | AuthError::Revoked | AuthError::Expired => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::AccountDisabled => StatusCode::FORBIDDEN,
            AuthError::TokenLimit { .. } => StatusCode::BAD_REQUEST,
            AuthError::LoginDisabled | AuthError::Signing(_) | AuthError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
