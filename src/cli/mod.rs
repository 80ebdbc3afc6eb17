//! Command-line interface: run the server and administer accounts and tokens.

mod commands;
pub mod error;

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::api::Config;
use crate::auth::{AuthError, Authenticator};
use crate::db::SqliteDatabase;
pub use commands::token::Grant;
use error::CliResult;

#[derive(Parser)]
#[command(name = "taskhub")]
#[command(author, version, about = "Task manager MCP server", long_about = None)]
pub struct Cli {
    /// Database file (default: TASKHUB_DB env or ~/.local/share/taskhub/taskhub.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server
    Serve {
        /// Host address to bind to (default: TASKHUB_HOST env or 0.0.0.0)
        #[arg(long)]
        host: Option<IpAddr>,
        /// Port to listen on (default: TASKHUB_PORT env or 3000)
        #[arg(short, long)]
        port: Option<u16>,
        /// Maximum number of concurrent MCP sessions
        #[arg(long)]
        max_sessions: Option<usize>,
    },
    /// User account commands
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Scoped API token commands
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
    /// Print a signed login token (requires TASKHUB_JWT_SECRET)
    LoginToken {
        username: String,
        /// Lifetime in hours
        #[arg(long, default_value = "24")]
        hours: i64,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create an account
    Add {
        username: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Re-enable a disabled account
    Enable { username: String },
    /// Disable an account; its credentials stop working
    Disable { username: String },
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Issue a token and print it once
    Create {
        username: String,
        /// Display name
        #[arg(long, default_value = "default")]
        name: String,
        /// Permissions to grant (repeatable; default: read-only)
        #[arg(long = "allow", value_enum)]
        allow: Vec<Grant>,
        /// Expire after this many days
        #[arg(long)]
        expires_in_days: Option<i64>,
    },
    /// List a user's tokens
    List {
        username: String,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Revoke a token by id
    Revoke { username: String, token_id: String },
}

pub async fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    execute(cli).await?;
    Ok(())
}

async fn database(config: &Config) -> CliResult<Arc<SqliteDatabase>> {
    Ok(Arc::new(
        commands::serve::open_database(&config.db_path).await?,
    ))
}

async fn execute(cli: Cli) -> CliResult<()> {
    let mut config = Config::new();
    if let Some(path) = cli.db {
        config = config.with_db_path(path);
    }

    let output = match cli.command {
        Commands::Serve {
            host,
            port,
            max_sessions,
        } => {
            if let Some(host) = host {
                config = config.with_host(host);
            }
            if let Some(port) = port {
                config = config.with_port(port);
            }
            if let Some(max) = max_sessions {
                config = config.with_max_sessions(max);
            }
            return commands::serve::run(config).await;
        }
        Commands::User { command } => {
            let db = database(&config).await?;
            match command {
                UserCommands::Add { username, email } => {
                    commands::user::add_user(&*db, &username, email.as_deref()).await?
                }
                UserCommands::Enable { username } => {
                    commands::user::set_user_active(&*db, &username, true).await?
                }
                UserCommands::Disable { username } => {
                    commands::user::set_user_active(&*db, &username, false).await?
                }
            }
        }
        Commands::Token { command } => {
            let db = database(&config).await?;
            match command {
                TokenCommands::Create {
                    username,
                    name,
                    allow,
                    expires_in_days,
                } => {
                    let authenticator = Authenticator::new(db.clone(), None);
                    commands::token::create_token(
                        &authenticator,
                        &*db,
                        &username,
                        &name,
                        &allow,
                        expires_in_days,
                    )
                    .await?
                }
                TokenCommands::List { username, format } => {
                    commands::token::list_tokens(&*db, &username, &format).await?
                }
                TokenCommands::Revoke { username, token_id } => {
                    commands::token::revoke_token(&*db, &username, &token_id).await?
                }
            }
        }
        Commands::LoginToken { username, hours } => {
            let keys = config.login_keys().ok_or(AuthError::LoginDisabled)?;
            let db = database(&config).await?;
            commands::token::login_token(&keys, &*db, &username, hours).await?
        }
    };

    println!("{output}");
    Ok(())
}
