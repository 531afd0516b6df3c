//! Bilbao CLI binary.
//!
//! Runs CAPM and Fama-French three-factor regressions for a set of Spanish
//! stocks against the IBEX 35.

mod integration;

use bilbao::data::load_factor_file;
use bilbao::data::yahoo::YahooQuoteProvider;
use bilbao::output::ExportFormat;
use bilbao::pipeline::DEFAULT_SUFFIX;
use bilbao::universe::ibex::DEFAULT_INDEX;
use bilbao::{AnalysisConfig, IbexUniverse, Universe, analyze, write_artifacts};
use chrono::{NaiveTime, Utc};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use integration::cache_manager;
use integration::data_pipeline::{FetchConfig, fetch_prices, fetch_symbol_data, print_cache_info};
use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::time::Duration as StdDuration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bilbao")]
#[command(about = "Bilbao: CAPM and Fama-French factor analysis of IBEX stocks", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the CAPM and three-factor regressions
    Analyze(AnalyzeArgs),

    /// Download each ticker and report what came back
    Check {
        /// Stock symbols, comma separated
        #[arg(long, value_delimiter = ',', default_values_t = IbexUniverse::new().symbols())]
        stocks: Vec<String>,

        /// Market index symbol
        #[arg(long, default_value = DEFAULT_INDEX)]
        index: String,

        /// Price window in years
        #[arg(long, default_value = "5")]
        years: u32,
    },

    /// Show or clear the quote cache
    Cache {
        /// Delete every cached quote
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    /// Stock symbols, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = IbexUniverse::new().symbols())]
    stocks: Vec<String>,

    /// Market index symbol
    #[arg(long, default_value = DEFAULT_INDEX)]
    index: String,

    /// Price window in years
    #[arg(long, default_value = "5")]
    years: u32,

    /// Fama-French three-factor file
    #[arg(long, default_value = "data/Europe_3_Factors.csv")]
    factors: PathBuf,

    /// Directory for result tables and the run report
    #[arg(long, default_value = "outputs")]
    output_dir: PathBuf,

    /// Directory for charts
    #[arg(long, default_value = "figures")]
    figures_dir: PathBuf,

    /// Suffix appended to artifact file names
    #[arg(long, default_value = DEFAULT_SUFFIX)]
    suffix: String,

    /// Result table format (csv, json or pretty-json)
    #[arg(long, default_value = "csv")]
    format: ExportFormat,

    /// Skip chart rendering
    #[arg(long)]
    no_charts: bool,

    /// Disable caching (always fetch fresh data)
    #[arg(long)]
    no_cache: bool,

    /// Force refresh cached data
    #[arg(long)]
    refresh: bool,
}

impl AnalyzeArgs {
    fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            stocks: self.stocks.clone(),
            index: self.index.clone(),
            years: self.years,
            factor_file: self.factors.clone(),
            output_dir: self.output_dir.clone(),
            figures_dir: self.figures_dir.clone(),
            suffix: self.suffix.clone(),
            format: self.format,
            charts: !self.no_charts,
            ..AnalysisConfig::default()
        }
    }

    const fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            use_cache: !self.no_cache,
            force_refresh: self.refresh,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze(args) => run_analysis(&args).await?,
        Commands::Check {
            stocks,
            index,
            years,
        } => check_tickers(&IbexUniverse::with_symbols(&index, &stocks), years).await?,
        Commands::Cache { clear } => manage_cache(clear)?,
    }

    Ok(())
}

fn step(message: &str) -> std::io::Result<()> {
    print!("{message}...");
    std::io::stdout().flush()
}

async fn run_analysis(args: &AnalyzeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.analysis_config();
    let fetch = args.fetch_config();
    let universe = config.universe();

    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{:^62}║", "CAPM & FAMA-FRENCH THREE-FACTOR ANALYSIS");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("Stocks: {}", universe.symbols().join(", "));
    println!("Index:  {}", universe.index());
    println!("Analysis Period: {} year(s)", config.years);
    if fetch.use_cache {
        print_cache_info();
        if fetch.force_refresh {
            println!("  Mode: Force refresh (re-fetching all data)");
        }
    } else {
        println!("  Cache: Disabled");
    }
    println!();

    step(&format!("Loading factors from {}", config.factor_file.display()))?;
    let factors = match load_factor_file(&config.factor_file) {
        Ok(f) => {
            println!(" ✓ ({} months)", f.len());
            f
        }
        Err(e) => {
            println!(" ✗");
            return Err(format!("Failed to load factor file: {}", e).into());
        }
    };

    let (start, end) = config.window(Utc::now().date_naive());
    let start = start.and_time(NaiveTime::MIN).and_utc();
    let end = end.and_time(NaiveTime::MIN).and_utc();
    info!(%start, %end, "downloading price data");

    let provider = YahooQuoteProvider::new()?;
    let pb = ProgressBar::new(universe.download_symbols().len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(StdDuration::from_millis(100));
    pb.set_message("Downloading price data...");

    let prices = match fetch_prices(&provider, &universe, start, end, fetch, Some(&pb)).await {
        Ok(p) => {
            pb.finish_with_message(format!("Fetched {} tickers", p.len()));
            p
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            return Err(e.into());
        }
    };

    step("Running CAPM and three-factor regressions")?;
    let analysis = match analyze(&prices, &factors, &universe) {
        Ok(a) => {
            println!(" ✓");
            a
        }
        Err(e) => {
            println!(" ✗");
            return Err(e.into());
        }
    };

    println!();
    print!("{}", analysis.diagnostics());
    let panel = analysis.panel.to_dataframe()?;
    println!("Data merged: shape {:?}", panel.shape());

    print!("{}", analysis.capm_summary().to_ascii_table());
    print!("{}", analysis.three_factor_summary().to_ascii_table());

    step("\nWriting results")?;
    let artifacts = write_artifacts(&analysis, &prices, &config)?;
    println!(" ✓");
    for path in artifacts.files() {
        println!("  {}", path.display());
    }
    println!("  {}", artifacts.report.display());

    println!("\n════════════════════════════════════════════════════════════════\n");

    Ok(())
}

async fn check_tickers(
    universe: &IbexUniverse,
    years: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AnalysisConfig {
        years,
        ..AnalysisConfig::default()
    };
    let (start, end) = config.window(Utc::now().date_naive());
    let start = start.and_time(NaiveTime::MIN).and_utc();
    let end = end.and_time(NaiveTime::MIN).and_utc();

    let provider = YahooQuoteProvider::new()?;
    let fetch = FetchConfig {
        use_cache: false,
        force_refresh: true,
    };

    println!("Ticker check ({} to {})", start.date_naive(), end.date_naive());
    println!("=====================================\n");
    for symbol in universe.download_symbols() {
        match fetch_symbol_data(&provider, &symbol, start, end, fetch, None).await {
            Ok(df) => println!(
                "  {:10} {:5} rows x {} columns",
                symbol,
                df.height(),
                df.width()
            ),
            Err(e) => println!("  {:10} no data ({})", symbol, e),
        }
    }

    Ok(())
}

fn manage_cache(clear: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("Quote cache");
    println!("===========\n");
    print_cache_info();

    if clear {
        cache_manager::open_cache()?.clear_all()?;
        println!("\n  Cache cleared.");
    }

    Ok(())
}
