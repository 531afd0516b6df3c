#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/bilbao/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod charts;
pub mod export;
pub mod report;
pub mod summary;

pub use charts::{ChartConfig, ChartError, render_price_chart, render_scatter_chart};
pub use export::{
    CapmRow, ExportError, ExportFormat, Exporter, TableRow, ThreeFactorRow, capm_rows,
    three_factor_rows,
};
pub use report::{PanelSpan, Report, ReportBuilder, ReportError};
pub use summary::{CoefficientStat, PanelDiagnostics, RegressionSummary, StockSummary};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
