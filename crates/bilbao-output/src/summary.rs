//! Console summaries of regression results and panel diagnostics.
//!
//! Provides terminal (ASCII) and Markdown renderings of the per-stock
//! regression tables, including standard errors, t-statistics and p-values
//! that the exported tables leave out.

use bilbao_regression::{CapmResult, ModelKind, OlsFit, ThreeFactorResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Estimate and test statistics for one coefficient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoefficientStat {
    /// Regressor name.
    pub name: String,

    /// Estimated coefficient.
    pub estimate: f64,

    /// Standard error.
    pub std_error: f64,

    /// t-statistic.
    pub t_stat: f64,

    /// Two-sided p-value.
    pub p_value: f64,
}

/// Regression summary for one stock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockSummary {
    /// Stock symbol.
    pub stock: String,

    /// Coefficients in design-matrix order, constant first.
    pub coefficients: Vec<CoefficientStat>,

    /// Coefficient of determination.
    pub r_squared: f64,

    /// Adjusted R².
    pub adj_r_squared: f64,

    /// F-statistic.
    pub f_statistic: f64,

    /// Number of observations.
    pub n_obs: usize,
}

impl StockSummary {
    /// Build a summary from a fit and the regressor names.
    pub fn new(stock: &str, names: &[&str], fit: &OlsFit) -> Self {
        let coefficients = names
            .iter()
            .enumerate()
            .map(|(i, name)| CoefficientStat {
                name: (*name).to_string(),
                estimate: fit.coefficients[i],
                std_error: fit.std_errors[i],
                t_stat: fit.t_stats[i],
                p_value: fit.p_values[i],
            })
            .collect();

        Self {
            stock: stock.to_string(),
            coefficients,
            r_squared: fit.r_squared,
            adj_r_squared: fit.adj_r_squared,
            f_statistic: fit.f_statistic,
            n_obs: fit.n_obs,
        }
    }
}

/// Summary of one model fitted across all valid stocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionSummary {
    /// Model that produced the fits.
    pub model: ModelKind,

    /// First and last month of the sample, if known.
    pub period: Option<(NaiveDate, NaiveDate)>,

    /// Per-stock summaries, in valid-stock order.
    pub stocks: Vec<StockSummary>,
}

const CAPM_NAMES: [&str; 2] = ["Alpha", "Beta"];
const FF3_NAMES: [&str; 4] = ["Alpha", "Beta", "SMB", "HML"];

impl RegressionSummary {
    /// Summarize CAPM results.
    pub fn capm(results: &[CapmResult], period: Option<(NaiveDate, NaiveDate)>) -> Self {
        Self {
            model: ModelKind::Capm,
            period,
            stocks: results
                .iter()
                .map(|r| StockSummary::new(&r.stock, &CAPM_NAMES, &r.fit))
                .collect(),
        }
    }

    /// Summarize three-factor results.
    pub fn three_factor(
        results: &[ThreeFactorResult],
        period: Option<(NaiveDate, NaiveDate)>,
    ) -> Self {
        Self {
            model: ModelKind::ThreeFactor,
            period,
            stocks: results
                .iter()
                .map(|r| StockSummary::new(&r.stock, &FF3_NAMES, &r.fit))
                .collect(),
        }
    }

    fn title(&self) -> String {
        match self.model {
            ModelKind::Capm => "CAPM Regression Results".to_string(),
            ModelKind::ThreeFactor => "Fama-French Three-Factor Regression Results".to_string(),
        }
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\n{}\n", self.title()));
        if let Some((start, end)) = self.period {
            output.push_str(&format!("Period: {} to {}\n", start, end));
        }
        output.push_str(&"=".repeat(80));
        output.push('\n');

        if self.stocks.is_empty() {
            output.push_str("  No valid stocks.\n");
        }

        for stock in &self.stocks {
            output.push_str(&format!(
                "\n{}  (n = {}, R² = {:.4}, adj. R² = {:.4}, F = {:.2})\n",
                stock.stock, stock.n_obs, stock.r_squared, stock.adj_r_squared, stock.f_statistic
            ));
            output.push_str(&"-".repeat(80));
            output.push('\n');
            output.push_str(&format!(
                "{:<12} {:>14} {:>14} {:>12} {:>12}\n",
                "Term", "Coefficient", "Std. Error", "t", "P>|t|"
            ));
            for coef in &stock.coefficients {
                output.push_str(&format!(
                    "{:<12} {:>14.6} {:>14.6} {:>12.3} {:>12.4}\n",
                    coef.name, coef.estimate, coef.std_error, coef.t_stat, coef.p_value
                ));
            }
        }

        output.push_str(&"=".repeat(80));
        output.push('\n');

        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# {}\n\n", self.title()));
        if let Some((start, end)) = self.period {
            output.push_str(&format!("**Period:** {} to {}\n\n", start, end));
        }

        let names: Vec<&str> = self
            .stocks
            .first()
            .map(|s| s.coefficients.iter().map(|c| c.name.as_str()).collect())
            .unwrap_or_default();

        output.push_str("| Stock |");
        for name in &names {
            output.push_str(&format!(" {name} | {name} t |"));
        }
        output.push_str(" R² | n |\n");
        output.push_str("|-------|");
        for _ in &names {
            output.push_str("------|------|");
        }
        output.push_str("----|---|\n");

        for stock in &self.stocks {
            output.push_str(&format!("| {} |", stock.stock));
            for coef in &stock.coefficients {
                output.push_str(&format!(" {:.4} | {:.2} |", coef.estimate, coef.t_stat));
            }
            output.push_str(&format!(" {:.4} | {} |\n", stock.r_squared, stock.n_obs));
        }

        output
    }
}

impl fmt::Display for RegressionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({} stocks)", self.title(), self.stocks.len())?;
        for stock in &self.stocks {
            let coefs: Vec<String> = stock
                .coefficients
                .iter()
                .map(|c| format!("{}={:.4}", c.name, c.estimate))
                .collect();
            writeln!(
                f,
                "  {}: {}, R²={:.4}",
                stock.stock,
                coefs.join(", "),
                stock.r_squared
            )?;
        }
        Ok(())
    }
}

/// Diagnostics about the data that went into the regressions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PanelDiagnostics {
    /// First and last month of the factor table.
    pub factor_range: Option<(NaiveDate, NaiveDate)>,

    /// First and last month of the merged panel.
    pub panel_range: Option<(NaiveDate, NaiveDate)>,

    /// Merged panel rows.
    pub rows: usize,

    /// Merged panel value columns.
    pub columns: usize,

    /// Stocks that entered the regressions.
    pub valid_stocks: Vec<String>,

    /// Stocks dropped for lack of data.
    pub excluded_stocks: Vec<String>,
}

fn format_range(range: Option<(NaiveDate, NaiveDate)>) -> String {
    range.map_or_else(|| "n/a".to_string(), |(s, e)| format!("{s} to {e}"))
}

impl fmt::Display for PanelDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Factor dates:  {}", format_range(self.factor_range))?;
        writeln!(f, "Merged panel:  {} rows x {} columns", self.rows, self.columns)?;
        writeln!(f, "Panel dates:   {}", format_range(self.panel_range))?;
        writeln!(f, "Valid stocks:  {}", self.valid_stocks.join(", "))?;
        if !self.excluded_stocks.is_empty() {
            writeln!(f, "Excluded:      {}", self.excluded_stocks.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bilbao_regression::{CapmModel, FactorInputs, FactorModel, ThreeFactorModel};

    fn d(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn inputs() -> ([f64; 6], [f64; 6], [f64; 6]) {
        (
            [0.01, -0.02, 0.03, 0.015, -0.005, 0.02],
            [0.002, 0.001, -0.003, 0.004, 0.0, -0.002],
            [-0.001, 0.003, 0.002, -0.002, 0.001, 0.004],
        )
    }

    #[test]
    fn test_capm_summary_tables() {
        let (market, smb, hml) = inputs();
        let factors = FactorInputs::new(&market, &smb, &hml);
        let excess = [0.012, -0.018, 0.035, 0.014, -0.004, 0.019];
        let results = CapmModel.fit_all([("COL.MC", &excess[..])], &factors).unwrap();

        let summary = RegressionSummary::capm(&results, Some((d(2023, 1), d(2023, 6))));
        assert_eq!(summary.stocks.len(), 1);
        assert_eq!(summary.stocks[0].coefficients.len(), 2);

        let ascii = summary.to_ascii_table();
        assert!(ascii.contains("CAPM Regression Results"));
        assert!(ascii.contains("Period: 2023-01-01 to 2023-06-01"));
        assert!(ascii.contains("COL.MC"));
        assert!(ascii.contains("P>|t|"));

        let markdown = summary.to_markdown();
        assert!(markdown.starts_with("# CAPM Regression Results"));
        assert!(markdown.contains("| Stock | Alpha | Alpha t | Beta | Beta t | R² | n |"));
        assert!(markdown.contains("| COL.MC |"));
    }

    #[test]
    fn test_three_factor_summary_names() {
        let (market, smb, hml) = inputs();
        let factors = FactorInputs::new(&market, &smb, &hml);
        let excess = [0.012, -0.018, 0.035, 0.014, -0.004, 0.021];
        let results = ThreeFactorModel
            .fit_all([("LOG.MC", &excess[..])], &factors)
            .unwrap();

        let summary = RegressionSummary::three_factor(&results, None);
        let names: Vec<&str> = summary.stocks[0]
            .coefficients
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Alpha", "Beta", "SMB", "HML"]);
        assert!(summary.to_string().contains("LOG.MC: Alpha="));
    }

    #[test]
    fn test_empty_summary() {
        let summary = RegressionSummary::capm(&[], None);
        assert!(summary.to_ascii_table().contains("No valid stocks."));
    }

    #[test]
    fn test_panel_diagnostics_display() {
        let diagnostics = PanelDiagnostics {
            factor_range: Some((d(1990, 7), d(2024, 8))),
            panel_range: Some((d(2020, 11), d(2024, 8))),
            rows: 46,
            columns: 8,
            valid_stocks: vec!["BKT.MC".to_string(), "ENG.MC".to_string()],
            excluded_stocks: vec!["ANA.MC".to_string()],
        };

        let text = diagnostics.to_string();
        assert!(text.contains("Factor dates:  1990-07-01 to 2024-08-01"));
        assert!(text.contains("46 rows x 8 columns"));
        assert!(text.contains("Valid stocks:  BKT.MC, ENG.MC"));
        assert!(text.contains("Excluded:      ANA.MC"));
    }
}
