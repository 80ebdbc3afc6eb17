//! `taskhub serve`: open the database and run the MCP server.

use std::path::Path;

use crate::api::{self, Config};
use crate::cli::error::CliResult;
use crate::db::{Database, SqliteDatabase};

/// Open (creating if needed) and migrate the database at `path`.
pub async fn open_database(path: &Path) -> CliResult<SqliteDatabase> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = SqliteDatabase::open(path).await?;
    db.migrate().await?;
    Ok(db)
}

pub async fn run(config: Config) -> CliResult<()> {
    let db = open_database(&config.db_path).await?;

    println!();
    println!("taskhub MCP server starting...");
    println!("   Streamable HTTP: http://{}:{}/mcp", config.host, config.port);
    println!("   Legacy SSE:      http://{}:{}/mcp/sse", config.host, config.port);
    println!("   Docs:            http://{}:{}/docs", config.host, config.port);
    println!("   Database:        {}", config.db_path.display());
    println!();

    api::run(config, db).await?;
    Ok(())
}
