//! Path resolution for taskhub directories.
//!
//! Provides XDG-compliant path resolution.

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "taskhub";
const DB_FILE: &str = "taskhub.db";

/// Get XDG-compliant data directory for taskhub.
///
/// Uses `$XDG_DATA_HOME/taskhub`, falling back to
/// `$HOME/.local/share/taskhub`, and to `./taskhub` when neither is set.
pub fn get_data_dir() -> PathBuf {
    let data_home = env::var_os("XDG_DATA_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            env::var_os("HOME")
                .filter(|v| !v.is_empty())
                .map(|home| PathBuf::from(home).join(".local/share"))
        })
        .unwrap_or_else(|| PathBuf::from("."));

    data_home.join(APP_DIR)
}

/// Get database file path (data_dir/taskhub.db).
pub fn get_db_path() -> PathBuf {
    get_data_dir().join(DB_FILE)
}
