use chrono::{Duration, Utc};
use clap::ValueEnum;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::auth::{Authenticator, LoginKeys};
use crate::cli::commands::user::find_user;
use crate::cli::error::{CliError, CliResult};
use crate::db::utils::format_timestamp;
use crate::db::{ApiToken, Database, TokenPermissions, TokenRepository};

/// A permission that can be granted to a scoped token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Grant {
    ReadTasks,
    CreateTasks,
    UpdateTasks,
    DeleteTasks,
    ReadCategories,
    CreateCategories,
    All,
}

/// Build the permission set for a token. No grants means the read-only default.
pub fn permissions_from(grants: &[Grant]) -> TokenPermissions {
    if grants.is_empty() {
        return TokenPermissions::default();
    }

    let mut perms = TokenPermissions::none();
    for grant in grants {
        match grant {
            Grant::ReadTasks => perms.can_read_tasks = true,
            Grant::CreateTasks => perms.can_create_tasks = true,
            Grant::UpdateTasks => perms.can_update_tasks = true,
            Grant::DeleteTasks => perms.can_delete_tasks = true,
            Grant::ReadCategories => perms.can_read_categories = true,
            Grant::CreateCategories => perms.can_create_categories = true,
            Grant::All => perms = TokenPermissions::all(),
        }
    }
    perms
}

fn expiry(days: Option<i64>) -> CliResult<Option<String>> {
    match days {
        None => Ok(None),
        Some(d) if d <= 0 => Err(CliError::InvalidInput {
            message: "--expires-in-days must be positive".to_string(),
        }),
        Some(d) => Ok(Some(format_timestamp(Utc::now() + Duration::days(d)))),
    }
}

pub async fn create_token<D: Database + 'static>(
    authenticator: &Authenticator<D>,
    db: &D,
    username: &str,
    name: &str,
    grants: &[Grant],
    expires_in_days: Option<i64>,
) -> CliResult<String> {
    let user = find_user(db, username).await?;
    let issued = authenticator
        .issue_token(
            &user.id,
            name,
            permissions_from(grants),
            expiry(expires_in_days)?,
        )
        .await?;

    Ok(format!(
        "Created token '{}' ({}) for {}\n\n{}\n\nStore it now; it will not be shown again.",
        issued.record.name, issued.record.id, user.username, issued.raw
    ))
}

#[derive(Tabled)]
struct TokenRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Prefix")]
    prefix: String,
    #[tabled(rename = "Grants")]
    grants: String,
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "Expires")]
    expires: String,
    #[tabled(rename = "Last used")]
    last_used: String,
}

fn grant_summary(p: &TokenPermissions) -> String {
    let flags = [
        (p.can_read_tasks, "read-tasks"),
        (p.can_create_tasks, "create-tasks"),
        (p.can_update_tasks, "update-tasks"),
        (p.can_delete_tasks, "delete-tasks"),
        (p.can_read_categories, "read-categories"),
        (p.can_create_categories, "create-categories"),
    ];
    let names: Vec<&str> = flags
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, name)| *name)
        .collect();
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}

impl From<&ApiToken> for TokenRow {
    fn from(token: &ApiToken) -> Self {
        Self {
            id: token.id.clone(),
            name: token.name.clone(),
            prefix: token.token_prefix.clone(),
            grants: grant_summary(&token.permissions),
            active: if token.is_active { "yes" } else { "no" }.to_string(),
            expires: token.expires_at.clone().unwrap_or_else(|| "never".to_string()),
            last_used: token.last_used_at.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Listed token without its hash.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenSummary<'a> {
    id: &'a str,
    name: &'a str,
    token_prefix: &'a str,
    permissions: &'a TokenPermissions,
    is_active: bool,
    expires_at: Option<&'a str>,
    last_used_at: Option<&'a str>,
    last_used_ip: Option<&'a str>,
    created_at: &'a str,
}

pub async fn list_tokens<D: Database>(db: &D, username: &str, format: &str) -> CliResult<String> {
    let user = find_user(db, username).await?;
    let tokens = db.tokens().list_by_user(&user.id).await?;

    match format {
        "json" => {
            let summaries: Vec<TokenSummary<'_>> = tokens
                .iter()
                .map(|t| TokenSummary {
                    id: &t.id,
                    name: &t.name,
                    token_prefix: &t.token_prefix,
                    permissions: &t.permissions,
                    is_active: t.is_active,
                    expires_at: t.expires_at.as_deref(),
                    last_used_at: t.last_used_at.as_deref(),
                    last_used_ip: t.last_used_ip.as_deref(),
                    created_at: &t.created_at,
                })
                .collect();
            Ok(serde_json::to_string_pretty(&summaries)?)
        }
        "table" => {
            if tokens.is_empty() {
                return Ok(format!("No tokens for {}.", user.username));
            }
            let mut table = Table::new(tokens.iter().map(TokenRow::from));
            table.with(Style::rounded());
            Ok(table.to_string())
        }
        other => Err(CliError::InvalidInput {
            message: format!("unknown format '{other}', expected table or json"),
        }),
    }
}

pub async fn revoke_token<D: Database>(db: &D, username: &str, token_id: &str) -> CliResult<String> {
    let user = find_user(db, username).await?;
    db.tokens().revoke(&user.id, token_id).await?;
    Ok(format!("Revoked token {token_id}"))
}

/// Sign a login token for a user. Disabled accounts get none.
pub async fn login_token<D: Database>(
    keys: &LoginKeys,
    db: &D,
    username: &str,
    hours: i64,
) -> CliResult<String> {
    if hours <= 0 {
        return Err(CliError::InvalidInput {
            message: "--hours must be positive".to_string(),
        });
    }
    let user = find_user(db, username).await?;
    if !user.is_active {
        return Err(CliError::InvalidInput {
            message: format!("user '{}' is disabled", user.username),
        });
    }
    Ok(keys.issue(&user.id, Duration::hours(hours))?)
}
