//! Analysis pipeline.
//!
//! Takes downloaded prices and the factor table through monthly returns, the
//! merged panel and both regressions, then writes every artifact of a run:
//!
//! ```text
//! outputs/CAPM_results_<suffix>.<ext>
//! outputs/FF3_results_<suffix>.<ext>
//! outputs/merged_panel_<suffix>.csv
//! outputs/run_report_<suffix>.json
//! figures/price_development_<suffix>.svg
//! figures/jointplot_<TICKER>_<suffix>.svg
//! ```

use crate::universe::{IbexUniverse, Universe, ibex::DEFAULT_INDEX};
use bilbao_data::{DataError, FactorTable, PriceSeries, PriceTable};
use bilbao_output::{
    ChartConfig, ChartError, ExportError, ExportFormat, Exporter, PanelDiagnostics, PanelSpan,
    RegressionSummary, ReportBuilder, ReportError, capm_rows, render_price_chart,
    render_scatter_chart, three_factor_rows,
};
use bilbao_regression::{
    CapmModel, CapmResult, FactorInputs, FactorModel, RegressionError, ThreeFactorModel,
    ThreeFactorResult,
};
use bilbao_returns::{
    ExcessReturns, MergedPanel, MonthlyReturns, ReturnSeries, ReturnsError, paired_returns,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur while running an analysis.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Data loading error
    #[error(transparent)]
    Data(#[from] DataError),

    /// Return computation error
    #[error(transparent)]
    Returns(#[from] ReturnsError),

    /// Regression error
    #[error(transparent)]
    Regression(#[from] RegressionError),

    /// Table export error
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Chart rendering error
    #[error(transparent)]
    Chart(#[from] ChartError),

    /// Run report error
    #[error(transparent)]
    Report(#[from] ReportError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The market index has no prices
    #[error("No price data for index {0}")]
    MissingIndex(String),

    /// None of the requested stocks has prices
    #[error("No price data for any of the requested stocks")]
    NoStockData,
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Default suffix appended to artifact file names.
pub const DEFAULT_SUFFIX: &str = "244604";

/// Settings of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Stock symbols, in result order.
    pub stocks: Vec<String>,

    /// Market index symbol.
    pub index: String,

    /// Length of the price window in years of 365 days.
    pub years: u32,

    /// Fama-French factor file.
    pub factor_file: PathBuf,

    /// Directory for tables, the merged panel and the run report.
    pub output_dir: PathBuf,

    /// Directory for charts.
    pub figures_dir: PathBuf,

    /// Suffix appended to every artifact file name.
    pub suffix: String,

    /// Format of the result tables.
    pub format: ExportFormat,

    /// Whether to render charts.
    pub charts: bool,

    /// Chart dimensions.
    pub chart: ChartConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            stocks: IbexUniverse::new().symbols(),
            index: DEFAULT_INDEX.to_string(),
            years: 5,
            factor_file: PathBuf::from("data/Europe_3_Factors.csv"),
            output_dir: PathBuf::from("outputs"),
            figures_dir: PathBuf::from("figures"),
            suffix: DEFAULT_SUFFIX.to_string(),
            format: ExportFormat::Csv,
            charts: true,
            chart: ChartConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Universe of the configured stocks and index.
    pub fn universe(&self) -> IbexUniverse {
        IbexUniverse::with_symbols(&self.index, &self.stocks)
    }

    /// Price window ending at `end`, inclusive.
    pub fn window(&self, end: NaiveDate) -> (NaiveDate, NaiveDate) {
        (end - Duration::days(365 * i64::from(self.years)), end)
    }

    fn output_file(&self, stem: &str, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("{stem}_{}.{extension}", self.suffix))
    }

    /// Path of the CAPM results table.
    pub fn capm_path(&self) -> PathBuf {
        self.output_file("CAPM_results", self.format.extension())
    }

    /// Path of the three-factor results table.
    pub fn three_factor_path(&self) -> PathBuf {
        self.output_file("FF3_results", self.format.extension())
    }

    /// Path of the merged panel export.
    pub fn panel_path(&self) -> PathBuf {
        self.output_file("merged_panel", "csv")
    }

    /// Path of the run report.
    pub fn report_path(&self) -> PathBuf {
        self.output_file("run_report", "json")
    }

    /// Path of the price development chart.
    pub fn price_chart_path(&self) -> PathBuf {
        self.figures_dir
            .join(format!("price_development_{}.svg", self.suffix))
    }

    /// Path of the scatter chart for one stock.
    pub fn scatter_path(&self, symbol: &str) -> PathBuf {
        self.figures_dir
            .join(format!("jointplot_{symbol}_{}.svg", self.suffix))
    }
}

/// Everything computed from one set of prices and factors.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Stocks requested, in order.
    pub requested: Vec<String>,

    /// Market index symbol.
    pub index: String,

    /// Monthly returns of every ticker with prices.
    pub returns: MonthlyReturns,

    /// Factor table span.
    pub factor_range: Option<(NaiveDate, NaiveDate)>,

    /// Merged panel.
    pub panel: MergedPanel,

    /// Excess returns of the valid stocks.
    pub excess: ExcessReturns,

    /// CAPM results, in valid-stock order.
    pub capm: Vec<CapmResult>,

    /// Three-factor results, in valid-stock order.
    pub three_factor: Vec<ThreeFactorResult>,
}

impl Analysis {
    /// Stocks that entered the regressions.
    pub fn valid_stocks(&self) -> Vec<&str> {
        self.excess.valid_stocks()
    }

    /// Stocks dropped for lack of data.
    pub fn excluded_stocks(&self) -> &[String] {
        self.excess.excluded_stocks()
    }

    /// Panel span, when the panel is not empty.
    pub fn panel_span(&self) -> Option<PanelSpan> {
        self.panel.date_range().map(|(start, end)| PanelSpan {
            start,
            end,
            observations: self.panel.len(),
        })
    }

    /// Data diagnostics for the console.
    pub fn diagnostics(&self) -> PanelDiagnostics {
        PanelDiagnostics {
            factor_range: self.factor_range,
            panel_range: self.panel.date_range(),
            rows: self.panel.len(),
            columns: self.panel.column_count(),
            valid_stocks: self.valid_stocks().into_iter().map(String::from).collect(),
            excluded_stocks: self.excluded_stocks().to_vec(),
        }
    }

    /// CAPM summary with full fit statistics.
    pub fn capm_summary(&self) -> RegressionSummary {
        RegressionSummary::capm(&self.capm, self.panel.date_range())
    }

    /// Three-factor summary with full fit statistics.
    pub fn three_factor_summary(&self) -> RegressionSummary {
        RegressionSummary::three_factor(&self.three_factor, self.panel.date_range())
    }

    /// Raw monthly returns of a stock paired with the index, within the
    /// factor table's range, as `(index_return, stock_return)`.
    ///
    /// Other stocks' histories do not narrow the scatter; only months where
    /// this stock or the index has no return are left out.
    pub fn scatter_points(&self, symbol: &str) -> Vec<(f64, f64)> {
        let stock = self.returns.get_or_empty(symbol);
        let index = self.returns.get_or_empty(&self.index);
        paired_returns(&stock, &index, self.factor_range)
            .into_iter()
            .map(|(_, s, i)| (i, s))
            .collect()
    }
}

/// Run returns, alignment and both regressions.
///
/// # Errors
///
/// Fails when the index or every stock lacks prices, or when a regression
/// input is not finite. A panel too short to identify every coefficient
/// still yields estimates, with NaN statistics where they are undefined.
pub fn analyze<U: Universe>(
    prices: &PriceTable,
    factors: &FactorTable,
    universe: &U,
) -> Result<Analysis> {
    let index = universe.index().to_string();
    let requested = universe.symbols();

    if !prices.has_data(&index) {
        return Err(PipelineError::MissingIndex(index));
    }
    if !requested.iter().any(|s| prices.has_data(s)) {
        return Err(PipelineError::NoStockData);
    }

    let factor_range = factors.date_range();
    if let Some((first, last)) = factor_range {
        info!(%first, %last, rows = factors.len(), "factor dates");
    }

    let returns = MonthlyReturns::from_prices(prices);
    let stock_returns: Vec<ReturnSeries> =
        requested.iter().map(|s| returns.get_or_empty(s)).collect();
    info!(
        stocks = stock_returns.len(),
        months = stock_returns.iter().map(ReturnSeries::len).max().unwrap_or(0),
        "stock returns"
    );

    let panel = MergedPanel::merge(&stock_returns, &returns.get_or_empty(&index), factors);
    let excess = panel.excess_returns();
    info!(valid = ?excess.valid_stocks(), "valid stocks");
    if !excess.excluded_stocks().is_empty() {
        warn!(excluded = ?excess.excluded_stocks(), "stocks without excess returns");
    }
    if excess.valid_stocks().is_empty() {
        warn!("no valid stocks; result tables will be empty");
    }

    let ff3_params = ThreeFactorModel.regressor_names().len();
    if !excess.valid_stocks().is_empty() && panel.len() <= ff3_params {
        warn!(
            rows = panel.len(),
            params = ff3_params,
            "panel too short for three-factor inference; its t-statistics will be NaN"
        );
    }

    let inputs = FactorInputs::new(excess.market(), excess.smb(), excess.hml());

    info!("running CAPM regressions");
    let capm = CapmModel.fit_all(excess.iter(), &inputs)?;

    info!("running Fama-French three-factor regressions");
    let three_factor = ThreeFactorModel.fit_all(excess.iter(), &inputs)?;

    Ok(Analysis {
        requested,
        index,
        returns,
        factor_range,
        panel,
        excess,
        capm,
        three_factor,
    })
}

/// Files written by [`write_artifacts`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    /// CAPM results table.
    pub capm: PathBuf,

    /// Three-factor results table.
    pub three_factor: PathBuf,

    /// Merged panel export.
    pub panel: PathBuf,

    /// Run report.
    pub report: PathBuf,

    /// Charts, price chart first.
    pub charts: Vec<PathBuf>,
}

impl Artifacts {
    /// All written files except the report, in write order.
    pub fn files(&self) -> Vec<&Path> {
        let mut files = vec![
            self.capm.as_path(),
            self.three_factor.as_path(),
            self.panel.as_path(),
        ];
        files.extend(self.charts.iter().map(PathBuf::as_path));
        files
    }
}

#[derive(Serialize)]
struct ReportContents {
    capm: RegressionSummary,
    three_factor: RegressionSummary,
    diagnostics: PanelDiagnostics,
}

fn render_charts(
    analysis: &Analysis,
    prices: &PriceTable,
    config: &AnalysisConfig,
) -> Result<Vec<PathBuf>> {
    let valid = analysis.valid_stocks();
    if valid.is_empty() {
        warn!("no valid stocks; skipping charts");
        return Ok(Vec::new());
    }
    std::fs::create_dir_all(&config.figures_dir)?;

    // Charts follow the valid-stock list even though they plot raw prices
    // and raw returns.
    let mut charts = Vec::new();
    let series: Vec<&PriceSeries> = valid.iter().filter_map(|s| prices.get(s)).collect();
    let price_path = config.price_chart_path();
    render_price_chart(&price_path, &series, &config.chart)?;
    charts.push(price_path);

    for symbol in valid {
        let points = analysis.scatter_points(symbol);
        if points.is_empty() {
            warn!(symbol, "no paired returns; skipping scatter chart");
            continue;
        }
        let path = config.scatter_path(symbol);
        render_scatter_chart(&path, symbol, &analysis.index, &points, &config.chart)?;
        charts.push(path);
    }

    Ok(charts)
}

/// Write result tables, the merged panel, charts and the run report.
///
/// # Errors
///
/// Returns the first export, rendering or IO error.
pub fn write_artifacts(
    analysis: &Analysis,
    prices: &PriceTable,
    config: &AnalysisConfig,
) -> Result<Artifacts> {
    std::fs::create_dir_all(&config.output_dir)?;

    let capm = config.capm_path();
    capm_rows(&analysis.capm).export_to_file(&capm, config.format)?;
    info!(path = %capm.display(), rows = analysis.capm.len(), "wrote CAPM results");

    let three_factor = config.three_factor_path();
    three_factor_rows(&analysis.three_factor).export_to_file(&three_factor, config.format)?;
    info!(
        path = %three_factor.display(),
        rows = analysis.three_factor.len(),
        "wrote three-factor results"
    );

    let panel = config.panel_path();
    analysis.panel.export_to_file(&panel, ExportFormat::Csv)?;

    let charts = if config.charts {
        render_charts(analysis, prices, config)?
    } else {
        Vec::new()
    };
    if !charts.is_empty() {
        info!(charts = charts.len(), dir = %config.figures_dir.display(), "rendered charts");
    }

    let artifacts = Artifacts {
        capm,
        three_factor,
        panel,
        report: config.report_path(),
        charts,
    };

    let contents = serde_json::to_value(ReportContents {
        capm: analysis.capm_summary(),
        three_factor: analysis.three_factor_summary(),
        diagnostics: analysis.diagnostics(),
    })
    .map_err(ReportError::from)?;
    let builder = artifacts.files().into_iter().fold(
        ReportBuilder::new()
            .index(analysis.index.as_str())
            .requested(analysis.requested.clone())
            .stocks(
                analysis.valid_stocks().into_iter().map(String::from).collect(),
                analysis.excluded_stocks().to_vec(),
            )
            .period_years(config.years)
            .panel(analysis.panel_span())
            .contents(contents),
        |builder, path| builder.artifact(path),
    );
    let report = builder.build()?;
    report.write_to_file(&artifacts.report)?;
    info!(path = %artifacts.report.display(), "wrote run report");

    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(
            config.stocks,
            vec!["BKT.MC", "ENG.MC", "ANA.MC", "COL.MC", "LOG.MC"]
        );
        assert_eq!(config.index, "^IBEX");
        assert_eq!(config.years, 5);
        assert_eq!(config.factor_file, PathBuf::from("data/Europe_3_Factors.csv"));
        assert!(config.charts);
    }

    #[test]
    fn test_window_is_365_day_years() {
        let config = AnalysisConfig::default();
        let end = NaiveDate::from_ymd_opt(2024, 9, 30).unwrap();
        let (start, last) = config.window(end);
        assert_eq!(last, end);
        assert_eq!((end - start).num_days(), 5 * 365);
    }

    #[rstest]
    #[case(ExportFormat::Csv, "outputs/CAPM_results_244604.csv")]
    #[case(ExportFormat::Json, "outputs/CAPM_results_244604.json")]
    #[case(ExportFormat::PrettyJson, "outputs/CAPM_results_244604.json")]
    fn test_table_path_follows_format(#[case] format: ExportFormat, #[case] expected: &str) {
        let config = AnalysisConfig {
            format,
            ..AnalysisConfig::default()
        };
        assert_eq!(config.capm_path(), PathBuf::from(expected));
    }

    #[test]
    fn test_artifact_paths() {
        let config = AnalysisConfig {
            suffix: "1".to_string(),
            ..AnalysisConfig::default()
        };
        assert_eq!(config.three_factor_path(), PathBuf::from("outputs/FF3_results_1.csv"));
        assert_eq!(config.panel_path(), PathBuf::from("outputs/merged_panel_1.csv"));
        assert_eq!(config.report_path(), PathBuf::from("outputs/run_report_1.json"));
        assert_eq!(
            config.price_chart_path(),
            PathBuf::from("figures/price_development_1.svg")
        );
        assert_eq!(
            config.scatter_path("COL.MC"),
            PathBuf::from("figures/jointplot_COL.MC_1.svg")
        );
    }

    #[test]
    fn test_universe_from_config() {
        let config = AnalysisConfig {
            stocks: vec!["san.mc".to_string(), "BKT.MC".to_string()],
            ..AnalysisConfig::default()
        };
        let universe = config.universe();
        assert_eq!(universe.index(), "^IBEX");
        assert_eq!(Universe::symbols(&universe), vec!["SAN.MC", "BKT.MC"]);
    }
}
