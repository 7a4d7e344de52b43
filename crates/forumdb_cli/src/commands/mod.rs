//! CLI command implementations.

pub mod compact;
pub mod init;
pub mod inspect;
pub mod list;
pub mod verify;

use forumdb::{Config, Forum, ForumConfig};
use forumdb_core::Store;
use std::path::Path;

/// Opens an existing store; commands other than `init` never create one.
pub fn open_store(path: &Path) -> Result<Store, Box<dyn std::error::Error>> {
    Ok(Store::open_with_config(
        path,
        Config::new().create_if_missing(false),
    )?)
}

/// Opens an existing store as a forum.
pub fn open_forum(path: &Path) -> Result<Forum, Box<dyn std::error::Error>> {
    let config = ForumConfig::new().store(Config::new().create_if_missing(false));
    Ok(Forum::open_with_config(path, config)?)
}

/// Formats a byte count for humans.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} bytes")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
