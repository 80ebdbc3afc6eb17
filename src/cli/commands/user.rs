use crate::cli::error::{CliError, CliResult};
use crate::db::{Database, DbError, User, UserRepository};

/// Look a user up by name, mapping a miss to a CLI error.
pub(crate) async fn find_user<D: Database>(db: &D, username: &str) -> CliResult<User> {
    match db.users().get_by_username(username).await {
        Ok(user) => Ok(user),
        Err(DbError::NotFound { .. }) => Err(CliError::UserNotFound {
            username: username.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

pub async fn add_user<D: Database>(
    db: &D,
    username: &str,
    email: Option<&str>,
) -> CliResult<String> {
    let username = username.trim();
    if username.is_empty() {
        return Err(CliError::InvalidInput {
            message: "username cannot be empty".to_string(),
        });
    }

    let user = db
        .users()
        .create(&User {
            id: String::new(),
            username: username.to_string(),
            email: email.map(str::trim).filter(|e| !e.is_empty()).map(String::from),
            is_active: true,
            created_at: String::new(),
        })
        .await
        .map_err(|e| match e {
            DbError::Constraint { .. } => CliError::InvalidInput {
                message: format!("user '{username}' already exists"),
            },
            other => other.into(),
        })?;

    Ok(format!("Created user '{}' ({})", user.username, user.id))
}

pub async fn set_user_active<D: Database>(
    db: &D,
    username: &str,
    active: bool,
) -> CliResult<String> {
    let user = find_user(db, username).await?;
    db.users().set_active(&user.id, active).await?;
    let state = if active { "enabled" } else { "disabled" };
    Ok(format!("User '{}' {state}", user.username))
}
