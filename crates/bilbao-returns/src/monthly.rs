//! Monthly Returns
//!
//! Resamples daily prices to one observation per calendar month and computes
//! simple returns between consecutive observed months:
//!
//! ```text
//! r[m] = (p[m] - p[m-1]) / p[m-1]
//! ```
//!
//! where `p[m]` is the last observed price of month `m`. Every return is keyed
//! by the first calendar day of its month so it lines up with factor files that
//! only carry a year and a month. The first observed month never has a return.

use bilbao_data::{PriceSeries, PriceTable};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// First calendar day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last observed price per calendar month, keyed by month start.
pub fn month_end_prices(prices: &PriceSeries) -> BTreeMap<NaiveDate, f64> {
    let mut months = BTreeMap::new();
    // Dates iterate in ascending order, so the final write per month wins.
    for (date, price) in prices.iter() {
        months.insert(month_start(date), price);
    }
    months
}

/// Fractional monthly returns for one ticker, keyed by month start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    symbol: String,
    returns: BTreeMap<NaiveDate, f64>,
}

impl ReturnSeries {
    /// Create an empty series.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            returns: BTreeMap::new(),
        }
    }

    /// Build a series from `(month, return)` pairs.
    ///
    /// Dates are relabelled to month start; non-finite returns are skipped.
    pub fn from_points(
        symbol: impl Into<String>,
        points: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Self {
        let mut series = Self::new(symbol);
        for (date, value) in points {
            if value.is_finite() {
                series.returns.insert(month_start(date), value);
            }
        }
        series
    }

    /// Compute monthly returns from daily prices.
    ///
    /// A ticker with fewer than two observed months yields an empty series.
    pub fn from_prices(prices: &PriceSeries) -> Self {
        let month_ends = month_end_prices(prices);
        let mut series = Self::new(prices.symbol());

        let mut previous: Option<f64> = None;
        for (month, price) in month_ends {
            if let Some(prev) = previous {
                let value = (price - prev) / prev;
                if value.is_finite() {
                    series.returns.insert(month, value);
                }
            }
            previous = Some(price);
        }

        debug!(
            symbol = prices.symbol(),
            days = prices.len(),
            months = series.len(),
            "computed monthly returns"
        );
        series
    }

    /// Ticker symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Return for a month-start date.
    pub fn get(&self, month: NaiveDate) -> Option<f64> {
        self.returns.get(&month).copied()
    }

    /// Number of months with a return.
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    /// Whether the series has no returns.
    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// First and last month, or `None` for an empty series.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.returns.keys().next()?;
        let last = self.returns.keys().next_back()?;
        Some((*first, *last))
    }

    /// Returns in date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.returns.iter().map(|(d, r)| (*d, *r))
    }

    /// Copy of the series restricted to `[start, end]`, both inclusive.
    pub fn restrict(&self, start: NaiveDate, end: NaiveDate) -> Self {
        if start > end {
            return Self::new(self.symbol.clone());
        }
        Self {
            symbol: self.symbol.clone(),
            returns: self
                .returns
                .range(start..=end)
                .map(|(d, r)| (*d, *r))
                .collect(),
        }
    }
}

/// Monthly returns for every ticker of a price table, in table order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReturns {
    series: Vec<ReturnSeries>,
}

impl MonthlyReturns {
    /// Compute monthly returns for every series in the table.
    pub fn from_prices(prices: &PriceTable) -> Self {
        Self {
            series: prices.iter().map(ReturnSeries::from_prices).collect(),
        }
    }

    /// Series for a symbol, if it was present in the price table.
    pub fn get(&self, symbol: &str) -> Option<&ReturnSeries> {
        self.series.iter().find(|s| s.symbol() == symbol)
    }

    /// Series for a symbol, or an empty series when the symbol had no prices.
    pub fn get_or_empty(&self, symbol: &str) -> ReturnSeries {
        self.get(symbol)
            .cloned()
            .unwrap_or_else(|| ReturnSeries::new(symbol))
    }

    /// All series in table order.
    pub fn iter(&self) -> impl Iterator<Item = &ReturnSeries> {
        self.series.iter()
    }

    /// Number of series.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Whether there are no series.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[rstest]
    #[case(d(2024, 1, 31), d(2024, 1, 1))]
    #[case(d(2024, 2, 29), d(2024, 2, 1))]
    #[case(d(2023, 12, 1), d(2023, 12, 1))]
    fn test_month_start(#[case] date: NaiveDate, #[case] expected: NaiveDate) {
        assert_eq!(month_start(date), expected);
    }

    #[test]
    fn test_last_price_per_month() {
        let prices = PriceSeries::from_points(
            "BKT.MC",
            [
                (d(2024, 1, 2), 10.0),
                (d(2024, 1, 30), 11.0),
                (d(2024, 1, 31), 12.0),
                (d(2024, 2, 1), 13.0),
                (d(2024, 2, 28), 15.0),
            ],
        );

        let months = month_end_prices(&prices);
        assert_eq!(months.len(), 2);
        assert_eq!(months[&d(2024, 1, 1)], 12.0);
        assert_eq!(months[&d(2024, 2, 1)], 15.0);
    }

    #[test]
    fn test_returns_use_consecutive_month_ends() {
        let prices = PriceSeries::from_points(
            "ENG.MC",
            [
                (d(2024, 1, 15), 99.0),
                (d(2024, 1, 31), 100.0),
                (d(2024, 2, 29), 110.0),
                (d(2024, 3, 5), 120.0),
                (d(2024, 3, 28), 99.0),
            ],
        );

        let returns = ReturnSeries::from_prices(&prices);
        assert_eq!(returns.len(), 2);
        assert_eq!(returns.get(d(2024, 1, 1)), None);
        assert_abs_diff_eq!(returns.get(d(2024, 2, 1)).unwrap(), 0.10, epsilon = 1e-12);
        assert_abs_diff_eq!(returns.get(d(2024, 3, 1)).unwrap(), -0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_entries_equal_months_minus_one() {
        let mut points = Vec::new();
        for month in 1..=12 {
            for day in [3, 10, 17, 24] {
                points.push((d(2023, month, day), 50.0 + month as f64 + day as f64 / 100.0));
            }
        }
        let prices = PriceSeries::from_points("ANA.MC", points);

        let returns = ReturnSeries::from_prices(&prices);
        assert_eq!(returns.len(), 11);
        assert_eq!(returns.date_range(), Some((d(2023, 2, 1), d(2023, 12, 1))));

        // Last observation of each month falls on the 24th.
        let feb = returns.get(d(2023, 2, 1)).unwrap();
        assert_abs_diff_eq!(feb, (52.24 - 51.24) / 51.24, epsilon = 1e-12);
    }

    #[rstest]
    #[case::no_prices(vec![])]
    #[case::single_day(vec![(d(2024, 1, 2), 10.0)])]
    #[case::single_month(vec![(d(2024, 1, 2), 10.0), (d(2024, 1, 31), 11.0)])]
    fn test_fewer_than_two_months_is_empty(#[case] points: Vec<(NaiveDate, f64)>) {
        let prices = PriceSeries::from_points("COL.MC", points);
        assert!(ReturnSeries::from_prices(&prices).is_empty());
    }

    #[test]
    fn test_gap_months_compare_observed_months() {
        let prices = PriceSeries::from_points(
            "LOG.MC",
            [(d(2024, 1, 31), 20.0), (d(2024, 4, 30), 25.0)],
        );
        let returns = ReturnSeries::from_prices(&prices);
        assert_eq!(returns.len(), 1);
        assert_abs_diff_eq!(returns.get(d(2024, 4, 1)).unwrap(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_price_does_not_produce_infinite_return() {
        let prices = PriceSeries::from_points(
            "LOG.MC",
            [(d(2024, 1, 31), 0.0), (d(2024, 2, 29), 25.0), (d(2024, 3, 29), 30.0)],
        );
        let returns = ReturnSeries::from_prices(&prices);
        assert_eq!(returns.len(), 1);
        assert!(returns.get(d(2024, 2, 1)).is_none());
    }

    #[test]
    fn test_restrict() {
        let series = ReturnSeries::from_points(
            "^IBEX",
            [
                (d(2024, 1, 31), 0.01),
                (d(2024, 2, 29), 0.02),
                (d(2024, 3, 28), 0.03),
            ],
        );

        let restricted = series.restrict(d(2024, 2, 1), d(2024, 3, 1));
        assert_eq!(restricted.len(), 2);
        assert_eq!(restricted.date_range(), Some((d(2024, 2, 1), d(2024, 3, 1))));
        assert!(series.restrict(d(2024, 3, 1), d(2024, 2, 1)).is_empty());
    }

    #[test]
    fn test_monthly_returns_table() {
        let mut table = PriceTable::new();
        table.insert(PriceSeries::from_points(
            "BKT.MC",
            [(d(2024, 1, 31), 10.0), (d(2024, 2, 29), 11.0)],
        ));
        table.insert(PriceSeries::new("ENG.MC"));

        let monthly = MonthlyReturns::from_prices(&table);
        assert_eq!(monthly.len(), 2);
        assert_eq!(monthly.get("BKT.MC").unwrap().len(), 1);
        assert!(monthly.get("ENG.MC").unwrap().is_empty());
        assert!(monthly.get_or_empty("ANA.MC").is_empty());
        assert_eq!(monthly.get_or_empty("ANA.MC").symbol(), "ANA.MC");
    }
}
