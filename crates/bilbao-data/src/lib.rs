#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/bilbao/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod error;
pub mod french;
pub mod prices;
pub mod yahoo;

pub use error::{DataError, Result};
pub use french::{FACTOR_COLUMNS, FactorRow, FactorTable, load_factor_file, parse_factor_csv};
pub use prices::{PriceSeries, PriceTable};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
