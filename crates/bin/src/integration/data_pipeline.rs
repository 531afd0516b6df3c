//! Data pipeline for fetching universe prices.
//!
//! Downloads adjusted daily closes ticker by ticker, stocks first and the
//! index last, consulting the SQLite cache before Yahoo Finance. A stock that
//! fails to download is skipped with a warning; the index failing, or every
//! stock failing, aborts the run.

use super::cache_manager;
use bilbao::Universe;
use bilbao_data::cache::SqliteCache;
use bilbao_data::yahoo::YahooQuoteProvider;
use bilbao_data::{DataError, PriceTable};
use chrono::{DateTime, NaiveDate, Utc};
use indicatif::ProgressBar;
use polars::prelude::*;
use tracing::{debug, warn};

/// Error type for data pipeline operations.
#[derive(Debug, thiserror::Error)]
pub(crate) enum DataPipelineError {
    /// Data fetch error from Yahoo or the cache.
    #[error("Data fetch error: {0}")]
    Fetch(#[from] DataError),

    /// Polars DataFrame error.
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    /// The market index could not be downloaded.
    #[error("Failed to fetch index {symbol}: {source}")]
    Index {
        /// Index symbol.
        symbol: String,
        /// Underlying failure.
        #[source]
        source: DataError,
    },

    /// Every stock failed to download.
    #[error("No price data fetched for any stock")]
    NoStockData,
}

/// Configuration for data fetching.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FetchConfig {
    /// Whether to use the cache.
    pub use_cache: bool,
    /// Whether to force refresh (ignore cached quotes).
    pub force_refresh: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            force_refresh: false,
        }
    }
}

/// Convert DateTime<Utc> to NaiveDate for cache lookups.
fn to_naive_date(dt: DateTime<Utc>) -> NaiveDate {
    dt.date_naive()
}

/// Fetch a single symbol's quotes, reading and filling the cache when given.
pub(crate) async fn fetch_symbol_data(
    provider: &YahooQuoteProvider,
    symbol: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    config: FetchConfig,
    cache: Option<&SqliteCache>,
) -> Result<DataFrame, DataError> {
    let start_date = to_naive_date(start);
    let end_date = to_naive_date(end);

    if !config.force_refresh
        && let Some(cache) = cache
        && cache
            .has_quotes(symbol, start_date, end_date)
            .unwrap_or(false)
        && let Ok(df) = cache.get_quotes(symbol, start_date, end_date)
    {
        return Ok(df);
    }

    let df = provider.fetch_quotes(symbol, start, end).await?;

    if let Some(cache) = cache
        && let Err(e) = cache.put_quotes(&df)
    {
        warn!(symbol, error = %e, "failed to cache quotes");
    }

    Ok(df)
}

/// Add the adjusted closes of one symbol's quote frame to the table.
///
/// Returns the number of prices added.
pub(crate) fn append_quotes(
    prices: &mut PriceTable,
    symbol: &str,
    quotes: &DataFrame,
) -> Result<usize, DataPipelineError> {
    let table = PriceTable::from_quotes(quotes)?;
    let Some(series) = table.get(symbol) else {
        return Ok(0);
    };
    let added = series.len();
    prices.insert(series.clone());
    Ok(added)
}

/// Fetch prices for every stock of the universe and its index.
pub(crate) async fn fetch_prices<U: Universe>(
    provider: &YahooQuoteProvider,
    universe: &U,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    config: FetchConfig,
    progress: Option<&ProgressBar>,
) -> Result<PriceTable, DataPipelineError> {
    let cache = if config.use_cache {
        cache_manager::open_cache()
            .map_err(|e| warn!(error = %e, "quote cache unavailable"))
            .ok()
    } else {
        None
    };

    let index = universe.index().to_string();
    let symbols = universe.download_symbols();
    if let Some(pb) = progress {
        pb.set_length(symbols.len() as u64);
    }

    let mut prices = PriceTable::new();
    let mut fetched_stocks = 0;
    for symbol in &symbols {
        if let Some(pb) = progress {
            pb.set_message(format!("Fetching {symbol}..."));
        }

        match fetch_symbol_data(provider, symbol, start, end, config, cache.as_ref()).await {
            Ok(df) => {
                let rows = append_quotes(&mut prices, symbol, &df)?;
                debug!(symbol, rows, "fetched prices");
                if *symbol != index && rows > 0 {
                    fetched_stocks += 1;
                }
            }
            Err(source) if *symbol == index => {
                return Err(DataPipelineError::Index {
                    symbol: index,
                    source,
                });
            }
            Err(e) => {
                let report =
                    || warn!(symbol = %symbol, error = %e, "failed to fetch prices; skipping");
                match progress {
                    Some(pb) => pb.suspend(report),
                    None => report(),
                }
            }
        }

        if let Some(pb) = progress {
            pb.inc(1);
        }
    }

    if fetched_stocks == 0 {
        return Err(DataPipelineError::NoStockData);
    }

    Ok(prices)
}

/// Print cache location and contents.
pub(crate) fn print_cache_info() {
    let path = cache_manager::cache_path();
    println!("  Cache location: {}", path.display());
    if let Some(stats) = cache_manager::open_cache()
        .ok()
        .and_then(|cache| cache.get_stats().ok())
    {
        println!(
            "  Cached data: {} quotes for {} symbols",
            stats.total_quotes, stats.unique_symbols
        );
    }
}
