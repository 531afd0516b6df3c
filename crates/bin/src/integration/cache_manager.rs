//! Cache manager for market data.
//!
//! Opens the SQLite quote cache at a platform-specific default location.

use bilbao_data::DataError;
use bilbao_data::cache::SqliteCache;
use std::path::PathBuf;

/// Get the default cache directory path.
///
/// Uses platform-specific cache directories:
/// - Linux: `~/.cache/bilbao/`
/// - macOS: `~/Library/Caches/bilbao/`
/// - Windows: `%LOCALAPPDATA%\bilbao\`
pub(crate) fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bilbao")
}

/// Get the cache database path.
pub(crate) fn cache_path() -> PathBuf {
    default_cache_dir().join("bilbao.db")
}

/// Open the cache, creating the directory if needed.
pub(crate) fn open_cache() -> Result<SqliteCache, DataError> {
    let cache_path = cache_path();

    if let Some(parent) = cache_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    SqliteCache::new(&cache_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_path_layout() {
        let path = cache_path();
        assert!(path.ends_with("bilbao/bilbao.db"));
        assert_eq!(path.parent(), Some(default_cache_dir().as_path()));
    }
}
