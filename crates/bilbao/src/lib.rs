#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/bilbao/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod pipeline;
pub mod universe;

// Re-export main types from sub-crates
pub use bilbao_data as data;
pub use bilbao_output as output;
pub use bilbao_regression as regression;
pub use bilbao_returns as returns;

pub use pipeline::{
    Analysis, AnalysisConfig, Artifacts, PipelineError, Result, analyze, write_artifacts,
};
pub use universe::{IbexUniverse, Universe};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
