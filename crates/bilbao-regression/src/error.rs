//! Error types for regression fitting.

use thiserror::Error;

/// Result type for regression operations.
pub type Result<T> = std::result::Result<T, RegressionError>;

/// Errors that can occur while fitting a regression.
#[derive(Debug, Error)]
pub enum RegressionError {
    /// Not enough observations to estimate every coefficient with residual degrees of freedom
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientObservations {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// The design matrix does not have full column rank
    #[error("Design matrix is singular")]
    Singular,

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Input contains NaN or infinite values
    #[error("Regression input contains non-finite values")]
    NonFinite,

    /// Test-statistic distribution could not be constructed
    #[error("Distribution error: {0}")]
    Distribution(String),

    /// Fit failed for a specific stock
    #[error("{model} regression failed for {symbol}: {source}")]
    Stock {
        /// Model that was being fitted
        model: String,
        /// Stock symbol
        symbol: String,
        /// Underlying error
        #[source]
        source: Box<RegressionError>,
    },
}
