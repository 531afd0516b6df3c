//! Typed daily price series.
//!
//! Quote frames coming from Yahoo or the cache are turned into one
//! [`PriceSeries`] per ticker. Missing and non-finite prices are dropped at
//! this boundary, so everything downstream only sees observed values.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Adjusted daily closes for one ticker, ordered by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    points: BTreeMap<NaiveDate, f64>,
}

impl PriceSeries {
    /// Create an empty series.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            points: BTreeMap::new(),
        }
    }

    /// Build a series from `(date, price)` pairs, skipping non-finite prices.
    pub fn from_points(
        symbol: impl Into<String>,
        points: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Self {
        let mut series = Self::new(symbol);
        for (date, price) in points {
            series.insert(date, price);
        }
        series
    }

    /// Record a price. Non-finite values are ignored; a repeated date overwrites.
    pub fn insert(&mut self, date: NaiveDate, price: f64) {
        if price.is_finite() {
            self.points.insert(date, price);
        }
    }

    /// Ticker symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Number of observed days.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no price was observed.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Price on a given day.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points.get(&date).copied()
    }

    /// First observed day.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.keys().next().copied()
    }

    /// Last observed day.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.keys().next_back().copied()
    }

    /// Observations in date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points.iter().map(|(d, p)| (*d, *p))
    }
}

/// Price series for a set of tickers, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    series: Vec<PriceSeries>,
}

impl PriceTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self { series: Vec::new() }
    }

    /// Add a series, replacing any existing series for the same symbol.
    pub fn insert(&mut self, series: PriceSeries) {
        if let Some(existing) = self
            .series
            .iter_mut()
            .find(|s| s.symbol() == series.symbol())
        {
            *existing = series;
        } else {
            self.series.push(series);
        }
    }

    /// Series for a symbol, if one was loaded.
    pub fn get(&self, symbol: &str) -> Option<&PriceSeries> {
        self.series.iter().find(|s| s.symbol() == symbol)
    }

    /// Whether a non-empty series exists for a symbol.
    pub fn has_data(&self, symbol: &str) -> bool {
        self.get(symbol).is_some_and(|s| !s.is_empty())
    }

    /// Symbols in insertion order.
    pub fn symbols(&self) -> Vec<&str> {
        self.series.iter().map(PriceSeries::symbol).collect()
    }

    /// Number of series.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Whether the table holds no series.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// All series in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &PriceSeries> {
        self.series.iter()
    }

    /// Build a table from a quote frame.
    ///
    /// The frame needs `symbol`, `date` and `adjusted_close` columns. Symbols
    /// keep the order of their first appearance; rows with a null field are
    /// skipped.
    pub fn from_quotes(quotes: &DataFrame) -> Result<Self> {
        let symbols = quotes.column("symbol")?.str()?;
        let dates = quotes.column("date")?.cast(&DataType::String)?;
        let dates = dates.str()?;
        let prices = quotes.column("adjusted_close")?.cast(&DataType::Float64)?;
        let prices = prices.f64()?;

        let mut table = Self::new();
        for i in 0..quotes.height() {
            let (Some(symbol), Some(date), Some(price)) =
                (symbols.get(i), dates.get(i), prices.get(i))
            else {
                continue;
            };
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| DataError::Parse(format!("invalid quote date '{date}': {e}")))?;

            match table.series.iter_mut().find(|s| s.symbol() == symbol) {
                Some(series) => series.insert(date, price),
                None => {
                    let mut series = PriceSeries::new(symbol);
                    series.insert(date, price);
                    table.series.push(series);
                }
            }
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_non_finite_prices_are_dropped() {
        let series = PriceSeries::from_points(
            "BKT.MC",
            [
                (d(2024, 1, 2), 10.0),
                (d(2024, 1, 3), f64::NAN),
                (d(2024, 1, 4), f64::INFINITY),
                (d(2024, 1, 5), 11.0),
            ],
        );

        assert_eq!(series.len(), 2);
        assert_eq!(series.first_date(), Some(d(2024, 1, 2)));
        assert_eq!(series.last_date(), Some(d(2024, 1, 5)));
        assert_eq!(series.get(d(2024, 1, 3)), None);
    }

    #[test]
    fn test_table_insert_replaces_same_symbol() {
        let mut table = PriceTable::new();
        table.insert(PriceSeries::from_points("ENG.MC", [(d(2024, 1, 2), 1.0)]));
        table.insert(PriceSeries::from_points("^IBEX", [(d(2024, 1, 2), 2.0)]));
        table.insert(PriceSeries::from_points("ENG.MC", [(d(2024, 1, 3), 3.0)]));

        assert_eq!(table.symbols(), vec!["ENG.MC", "^IBEX"]);
        assert_eq!(table.get("ENG.MC").unwrap().get(d(2024, 1, 3)), Some(3.0));
        assert!(!table.has_data("ANA.MC"));
    }

    #[test]
    fn test_from_quotes() {
        let df = DataFrame::new(vec![
            Series::new("symbol".into(), ["COL.MC", "COL.MC", "^IBEX"]).into(),
            Series::new("date".into(), ["2024-01-02", "2024-01-03", "2024-01-02"]).into(),
            Series::new("adjusted_close".into(), [Some(7.5), None, Some(10_000.0)]).into(),
        ])
        .unwrap()
        .lazy()
        .with_column(col("date").cast(DataType::Date))
        .collect()
        .unwrap();

        let table = PriceTable::from_quotes(&df).unwrap();
        assert_eq!(table.symbols(), vec!["COL.MC", "^IBEX"]);
        assert_eq!(table.get("COL.MC").unwrap().len(), 1);
        assert_eq!(table.get("^IBEX").unwrap().get(d(2024, 1, 2)), Some(10_000.0));
    }

    #[test]
    fn test_from_quotes_missing_column() {
        let df = DataFrame::new(vec![Series::new("symbol".into(), ["LOG.MC"]).into()]).unwrap();
        assert!(matches!(
            PriceTable::from_quotes(&df),
            Err(DataError::Polars(_))
        ));
    }
}
