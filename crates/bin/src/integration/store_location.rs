//! Database location.
//!
//! The database lives in a platform-specific data directory unless a path is
//! given on the command line or in the configuration.

use ankara_data::{DataError, SqliteStore};
use std::path::{Path, PathBuf};

/// Get the default data directory path.
///
/// - Linux: `~/.local/share/ankara/`
/// - macOS: `~/Library/Application Support/ankara/`
/// - Windows: `%APPDATA%\ankara\`
pub(crate) fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ankara")
}

/// Get the default database path.
pub(crate) fn default_database_path() -> PathBuf {
    default_data_dir().join("ankara.db")
}

/// Pick the database path: command line, then configuration, then default.
pub(crate) fn resolve_database_path(cli: Option<&Path>, configured: Option<&Path>) -> PathBuf {
    cli.or(configured)
        .map_or_else(default_database_path, Path::to_path_buf)
}

/// Open the store, creating the directory if needed.
pub(crate) fn open_store(path: &Path) -> Result<SqliteStore, DataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    SqliteStore::new(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_path_wins() {
        let cli = PathBuf::from("/tmp/cli.db");
        let configured = PathBuf::from("/tmp/configured.db");
        assert_eq!(
            resolve_database_path(Some(cli.as_path()), Some(configured.as_path())),
            cli
        );
        assert_eq!(resolve_database_path(None, Some(configured.as_path())), configured);
        assert!(resolve_database_path(None, None).ends_with("ankara/ankara.db"));
    }

    #[test]
    fn test_open_store_creates_directory() {
        let dir = std::env::temp_dir().join("ankara_store_location_test");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("ankara.db");

        let store = open_store(&path).unwrap();
        assert_eq!(store.get_stats().unwrap().observation_count, 0);
        assert!(path.exists());

        drop(store);
        std::fs::remove_dir_all(dir).ok();
    }
}
