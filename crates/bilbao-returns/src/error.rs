//! Error types for return construction.

use thiserror::Error;

/// Result type for return operations.
pub type Result<T> = std::result::Result<T, ReturnsError>;

/// Errors that can occur while building returns or the merged panel.
#[derive(Debug, Error)]
pub enum ReturnsError {
    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
