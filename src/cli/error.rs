use miette::Diagnostic;
use thiserror::Error;

use crate::api::ServerError;
use crate::auth::AuthError;
use crate::db::DbError;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error("User not found: {username}")]
    #[diagnostic(
        code(taskhub::cli::user_not_found),
        help("Create the account first: taskhub user add {username}")
    )]
    UserNotFound { username: String },

    #[error("Invalid input: {message}")]
    #[diagnostic(code(taskhub::cli::invalid_input))]
    InvalidInput { message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Server(#[from] ServerError),

    #[error("Failed to create data directory: {0}")]
    #[diagnostic(code(taskhub::cli::io))]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(taskhub::cli::output))]
    Output(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;
