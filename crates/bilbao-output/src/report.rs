//! Run report generation.
//!
//! A run report records what was requested, what survived alignment, and
//! where every artifact was written.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Required field was not set on the builder.
    #[error("Missing report field: {0}")]
    MissingField(&'static str),
}

/// Date span and size of the merged panel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PanelSpan {
    /// First panel month.
    pub start: NaiveDate,

    /// Last panel month.
    pub end: NaiveDate,

    /// Number of monthly observations.
    pub observations: usize,
}

/// A report of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,

    /// Market index symbol.
    pub index: String,

    /// Stock symbols requested, in order.
    pub requested: Vec<String>,

    /// Stocks that entered the regressions.
    pub valid_stocks: Vec<String>,

    /// Stocks dropped for lack of data.
    pub excluded_stocks: Vec<String>,

    /// Price window in years.
    pub period_years: u32,

    /// Merged panel span, absent when the panel is empty.
    pub panel: Option<PanelSpan>,

    /// Files written by the run.
    pub artifacts: Vec<PathBuf>,

    /// Additional report contents (JSON format).
    pub contents: serde_json::Value,
}

impl Report {
    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON.
    pub fn write_to_file(&self, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    index: Option<String>,
    requested: Vec<String>,
    valid_stocks: Vec<String>,
    excluded_stocks: Vec<String>,
    period_years: Option<u32>,
    panel: Option<PanelSpan>,
    artifacts: Vec<PathBuf>,
    contents: Option<serde_json::Value>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the index symbol.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Set the requested stocks.
    pub fn requested(mut self, stocks: Vec<String>) -> Self {
        self.requested = stocks;
        self
    }

    /// Set the valid and excluded stocks.
    pub fn stocks(mut self, valid: Vec<String>, excluded: Vec<String>) -> Self {
        self.valid_stocks = valid;
        self.excluded_stocks = excluded;
        self
    }

    /// Set the analysis period.
    pub const fn period_years(mut self, years: u32) -> Self {
        self.period_years = Some(years);
        self
    }

    /// Set the panel span.
    pub const fn panel(mut self, panel: Option<PanelSpan>) -> Self {
        self.panel = panel;
        self
    }

    /// Record a written artifact.
    pub fn artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifacts.push(path.into());
        self
    }

    /// Set the report contents.
    pub fn contents(mut self, contents: serde_json::Value) -> Self {
        self.contents = Some(contents);
        self
    }

    /// Build the report.
    pub fn build(self) -> Result<Report, ReportError> {
        Ok(Report {
            timestamp: Utc::now(),
            index: self.index.ok_or(ReportError::MissingField("index"))?,
            requested: self.requested,
            valid_stocks: self.valid_stocks,
            excluded_stocks: self.excluded_stocks,
            period_years: self.period_years.unwrap_or(5),
            panel: self.panel,
            artifacts: self.artifacts,
            contents: self.contents.unwrap_or(serde_json::Value::Null),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_builder() {
        let report = ReportBuilder::new()
            .index("^IBEX")
            .requested(vec!["BKT.MC".to_string(), "ANA.MC".to_string()])
            .stocks(vec!["BKT.MC".to_string()], vec!["ANA.MC".to_string()])
            .period_years(3)
            .panel(Some(PanelSpan {
                start: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
                observations: 36,
            }))
            .artifact("outputs/CAPM_results_244604.csv")
            .contents(serde_json::json!({"key": "value"}))
            .build()
            .unwrap();

        assert_eq!(report.index, "^IBEX");
        assert_eq!(report.period_years, 3);
        assert_eq!(report.artifacts.len(), 1);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"valid_stocks\""));
        assert!(json.contains("\"ANA.MC\""));
        assert!(json.contains("\"observations\": 36"));
    }

    #[test]
    fn test_report_requires_index() {
        let result = ReportBuilder::new().period_years(5).build();
        assert!(matches!(result, Err(ReportError::MissingField("index"))));
    }

    #[test]
    fn test_report_defaults() {
        let report = ReportBuilder::new().index("^IBEX").build().unwrap();
        assert_eq!(report.period_years, 5);
        assert!(report.panel.is_none());
        assert!(report.contents.is_null());
    }
}
