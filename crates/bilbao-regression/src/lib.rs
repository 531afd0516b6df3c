#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/bilbao/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod model;
pub mod ols;

// Re-export main types
pub use error::{RegressionError, Result};
pub use model::{
    CapmModel, CapmResult, FactorInputs, FactorModel, ModelKind, ThreeFactorModel,
    ThreeFactorResult,
};
pub use ols::OlsFit;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
