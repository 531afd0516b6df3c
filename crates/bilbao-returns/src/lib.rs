#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/bilbao/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod monthly;
pub mod panel;

pub use error::{Result, ReturnsError};
pub use monthly::{MonthlyReturns, ReturnSeries, month_end_prices, month_start};
pub use panel::{ExcessReturns, MergedPanel, StockColumn, overlapping_range, paired_returns};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
