//! Caching layer for downloaded quotes.

pub mod sqlite;

pub use sqlite::{CacheStats, SqliteCache};
