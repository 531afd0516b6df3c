//! Export of result tables and the merged panel.
//!
//! Result tables are written with fixed column headers so downstream
//! spreadsheets keep working across runs:
//!
//! - CAPM: `Stock, Alpha, Beta_IBEX, Alpha_t, Beta_t, R2`
//! - Three-factor: `Stock, Alpha, Beta_IBEX, SMB_coef, HML_coef, R2`
//!
//! CSV output always carries the header line, even for an empty table.

use bilbao_regression::{CapmResult, ThreeFactorResult};
use bilbao_returns::MergedPanel;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    /// Comma-separated values format.
    #[default]
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// A record type with a fixed CSV header.
pub trait TableRow: Serialize {
    /// Column names, in serialization order.
    const HEADERS: &'static [&'static str];
}

/// One row of the CAPM results table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapmRow {
    /// Stock symbol.
    #[serde(rename = "Stock")]
    pub stock: String,

    /// Intercept.
    #[serde(rename = "Alpha")]
    pub alpha: f64,

    /// Market beta.
    #[serde(rename = "Beta_IBEX")]
    pub beta: f64,

    /// t-statistic of the intercept.
    #[serde(rename = "Alpha_t")]
    pub alpha_t: f64,

    /// t-statistic of the market beta.
    #[serde(rename = "Beta_t")]
    pub beta_t: f64,

    /// Coefficient of determination.
    #[serde(rename = "R2")]
    pub r_squared: f64,
}

impl TableRow for CapmRow {
    const HEADERS: &'static [&'static str] =
        &["Stock", "Alpha", "Beta_IBEX", "Alpha_t", "Beta_t", "R2"];
}

impl From<&CapmResult> for CapmRow {
    fn from(result: &CapmResult) -> Self {
        Self {
            stock: result.stock.clone(),
            alpha: result.alpha,
            beta: result.beta,
            alpha_t: result.alpha_t,
            beta_t: result.beta_t,
            r_squared: result.r_squared,
        }
    }
}

/// One row of the three-factor results table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThreeFactorRow {
    /// Stock symbol.
    #[serde(rename = "Stock")]
    pub stock: String,

    /// Intercept.
    #[serde(rename = "Alpha")]
    pub alpha: f64,

    /// Market beta.
    #[serde(rename = "Beta_IBEX")]
    pub beta: f64,

    /// Size loading.
    #[serde(rename = "SMB_coef")]
    pub smb: f64,

    /// Value loading.
    #[serde(rename = "HML_coef")]
    pub hml: f64,

    /// Coefficient of determination.
    #[serde(rename = "R2")]
    pub r_squared: f64,
}

impl TableRow for ThreeFactorRow {
    const HEADERS: &'static [&'static str] =
        &["Stock", "Alpha", "Beta_IBEX", "SMB_coef", "HML_coef", "R2"];
}

impl From<&ThreeFactorResult> for ThreeFactorRow {
    fn from(result: &ThreeFactorResult) -> Self {
        Self {
            stock: result.stock.clone(),
            alpha: result.alpha,
            beta: result.beta,
            smb: result.smb,
            hml: result.hml,
            r_squared: result.r_squared,
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn csv_to_string(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

impl<T: TableRow> Exporter for Vec<T> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(vec![]);
                wtr.write_record(T::HEADERS)?;
                for record in self {
                    wtr.serialize(record)?;
                }
                csv_to_string(wtr)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

/// Convert CAPM results into table rows, keeping their order.
pub fn capm_rows(results: &[CapmResult]) -> Vec<CapmRow> {
    results.iter().map(CapmRow::from).collect()
}

/// Convert three-factor results into table rows, keeping their order.
pub fn three_factor_rows(results: &[ThreeFactorResult]) -> Vec<ThreeFactorRow> {
    results.iter().map(ThreeFactorRow::from).collect()
}

impl Exporter for MergedPanel {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                wtr.write_record(self.headers())?;
                for record in self.records() {
                    wtr.write_record(&record)?;
                }
                csv_to_string(wtr)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}
