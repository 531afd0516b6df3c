//! Merged return/factor panel.
//!
//! Joins stock returns, index returns and factor rows on month-start dates.
//! The join is restricted to the overlapping date range of all inputs, then
//! any month missing a value in any column is dropped, so every row of a
//! [`MergedPanel`] is complete.
//!
//! A stock without a single monthly return contributes no column at all; it
//! would otherwise empty the whole panel. Such stocks end up with an empty
//! excess-return series and are reported as excluded.

use crate::error::Result;
use crate::monthly::ReturnSeries;
use bilbao_data::{FactorRow, FactorTable};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One stock column of the panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockColumn {
    /// Ticker symbol.
    pub symbol: String,
    /// Monthly returns aligned with the panel dates, or `None` when the stock
    /// had no returns to join.
    pub values: Option<Vec<f64>>,
}

/// Inner join of stock returns, index returns and factor rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedPanel {
    dates: Vec<NaiveDate>,
    stocks: Vec<StockColumn>,
    index_symbol: String,
    index: Vec<f64>,
    factors: Vec<FactorRow>,
}

/// Overlap of several `[first, last]` ranges, or `None` if they are disjoint
/// or any range is missing.
pub fn overlapping_range(
    ranges: impl IntoIterator<Item = Option<(NaiveDate, NaiveDate)>>,
) -> Option<(NaiveDate, NaiveDate)> {
    let mut overlap: Option<(NaiveDate, NaiveDate)> = None;
    for range in ranges {
        let (start, end) = range?;
        overlap = Some(match overlap {
            None => (start, end),
            Some((s, e)) => (s.max(start), e.min(end)),
        });
    }
    overlap.filter(|(start, end)| start <= end)
}

impl MergedPanel {
    /// Build the panel.
    ///
    /// # Arguments
    /// * `stocks` - Monthly returns per stock, in the order results should follow
    /// * `index` - Monthly returns of the market index
    /// * `factors` - Factor rows; their own first and last month clamp the range
    pub fn merge(stocks: &[ReturnSeries], index: &ReturnSeries, factors: &FactorTable) -> Self {
        let participating: Vec<&ReturnSeries> = stocks.iter().filter(|s| !s.is_empty()).collect();

        let range = overlapping_range(
            std::iter::once(factors.date_range())
                .chain(std::iter::once(index.date_range()))
                .chain(participating.iter().map(|s| s.date_range())),
        );

        let mut dates = Vec::new();
        let mut index_values = Vec::new();
        let mut factor_rows = Vec::new();
        let mut stock_values: Vec<Vec<f64>> = vec![Vec::new(); participating.len()];

        if let Some((start, end)) = range {
            let index = index.restrict(start, end);
            let restricted: Vec<ReturnSeries> =
                participating.iter().map(|s| s.restrict(start, end)).collect();

            for (date, row) in factors.iter().filter(|(d, _)| *d >= start && *d <= end) {
                let Some(index_value) = index.get(date) else {
                    continue;
                };
                let Some(row_values) = restricted
                    .iter()
                    .map(|s| s.get(date))
                    .collect::<Option<Vec<f64>>>()
                else {
                    continue;
                };

                dates.push(date);
                index_values.push(index_value);
                factor_rows.push(*row);
                for (column, value) in stock_values.iter_mut().zip(row_values) {
                    column.push(value);
                }
            }
        }

        let mut filled = stock_values.into_iter();
        let columns = stocks
            .iter()
            .map(|s| StockColumn {
                symbol: s.symbol().to_string(),
                values: if s.is_empty() { None } else { filled.next() },
            })
            .collect();

        let panel = Self {
            dates,
            stocks: columns,
            index_symbol: index.symbol().to_string(),
            index: index_values,
            factors: factor_rows,
        };

        match panel.date_range() {
            Some((first, last)) => info!(
                rows = panel.len(),
                columns = panel.column_count(),
                %first,
                %last,
                "merged returns with factors"
            ),
            None => info!("merged panel is empty"),
        }
        panel
    }

    /// Panel dates (month starts), ascending.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the panel has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of value columns: joined stocks, the index and four factors.
    pub fn column_count(&self) -> usize {
        self.stocks.iter().filter(|s| s.values.is_some()).count() + 1 + 4
    }

    /// First and last panel month.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.dates.first()?, *self.dates.last()?))
    }

    /// Stock columns in input order, including stocks that were not joined.
    pub fn stocks(&self) -> &[StockColumn] {
        &self.stocks
    }

    /// Returns of one stock aligned with [`Self::dates`].
    pub fn stock(&self, symbol: &str) -> Option<&[f64]> {
        self.stocks
            .iter()
            .find(|s| s.symbol == symbol)
            .and_then(|s| s.values.as_deref())
    }

    /// Index symbol.
    pub fn index_symbol(&self) -> &str {
        &self.index_symbol
    }

    /// Index returns aligned with [`Self::dates`].
    pub fn index(&self) -> &[f64] {
        &self.index
    }

    /// Factor rows aligned with [`Self::dates`].
    pub fn factors(&self) -> &[FactorRow] {
        &self.factors
    }

    /// Derive excess returns and the valid-stock list.
    pub fn excess_returns(&self) -> ExcessReturns {
        let rf: Vec<f64> = self.factors.iter().map(|f| f.rf).collect();
        let subtract_rf = |values: &[f64]| -> Vec<f64> {
            values.iter().zip(&rf).map(|(r, rf)| r - rf).collect()
        };

        let mut stocks = Vec::new();
        let mut excluded = Vec::new();
        for column in &self.stocks {
            let excess = column
                .values
                .as_deref()
                .map(subtract_rf)
                .unwrap_or_default();
            if excess.is_empty() {
                excluded.push(column.symbol.clone());
            } else {
                stocks.push((column.symbol.clone(), excess));
            }
        }

        debug!(
            valid = stocks.len(),
            excluded = excluded.len(),
            "derived excess returns"
        );

        ExcessReturns {
            dates: self.dates.clone(),
            stocks,
            excluded,
            market: subtract_rf(&self.index),
            smb: self.factors.iter().map(|f| f.smb).collect(),
            hml: self.factors.iter().map(|f| f.hml).collect(),
        }
    }

    /// Column headers used by [`Self::to_dataframe`] and CSV export.
    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec!["Date".to_string()];
        headers.extend(
            self.stocks
                .iter()
                .filter(|s| s.values.is_some())
                .map(|s| s.symbol.clone()),
        );
        headers.push(self.index_symbol.clone());
        headers.extend(bilbao_data::FACTOR_COLUMNS.iter().map(|c| c.to_string()));
        headers
    }

    /// Panel rows as string records, matching [`Self::headers`].
    pub fn records(&self) -> Vec<Vec<String>> {
        (0..self.len())
            .map(|i| {
                let mut record = vec![self.dates[i].to_string()];
                for column in &self.stocks {
                    if let Some(values) = &column.values {
                        record.push(values[i].to_string());
                    }
                }
                record.push(self.index[i].to_string());
                let f = &self.factors[i];
                record.extend([f.mkt_rf, f.smb, f.hml, f.rf].map(|v| v.to_string()));
                record
            })
            .collect()
    }

    /// Panel as a Polars DataFrame with one column per header.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = vec![
            Series::new("Date".into(), self.dates.clone())
                .cast(&DataType::Date)?
                .into(),
        ];
        for column in &self.stocks {
            if let Some(values) = &column.values {
                columns.push(Series::new(column.symbol.as_str().into(), values.clone()).into());
            }
        }
        columns.push(Series::new(self.index_symbol.as_str().into(), self.index.clone()).into());

        let [mkt_rf, smb, hml, rf] = bilbao_data::FACTOR_COLUMNS;
        columns.push(Series::new(mkt_rf.into(), self.factor_values(|f| f.mkt_rf)).into());
        columns.push(Series::new(smb.into(), self.factor_values(|f| f.smb)).into());
        columns.push(Series::new(hml.into(), self.factor_values(|f| f.hml)).into());
        columns.push(Series::new(rf.into(), self.factor_values(|f| f.rf)).into());

        Ok(DataFrame::new(columns)?)
    }

    fn factor_values(&self, field: impl Fn(&FactorRow) -> f64) -> Vec<f64> {
        self.factors.iter().map(field).collect()
    }
}

/// Excess returns of the valid stocks plus the regressors shared by all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcessReturns {
    dates: Vec<NaiveDate>,
    stocks: Vec<(String, Vec<f64>)>,
    excluded: Vec<String>,
    market: Vec<f64>,
    smb: Vec<f64>,
    hml: Vec<f64>,
}

impl ExcessReturns {
    /// Panel dates the series are aligned with.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Stocks with at least one excess-return observation, in input order.
    pub fn valid_stocks(&self) -> Vec<&str> {
        self.stocks.iter().map(|(s, _)| s.as_str()).collect()
    }

    /// Stocks dropped because their excess-return series was empty.
    pub fn excluded_stocks(&self) -> &[String] {
        &self.excluded
    }

    /// Excess returns of a valid stock.
    pub fn stock(&self, symbol: &str) -> Option<&[f64]> {
        self.stocks
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, v)| v.as_slice())
    }

    /// Valid stocks with their excess returns, in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.stocks.iter().map(|(s, v)| (s.as_str(), v.as_slice()))
    }

    /// Index return minus the risk-free rate.
    pub fn market(&self) -> &[f64] {
        &self.market
    }

    /// Size factor.
    pub fn smb(&self) -> &[f64] {
        &self.smb
    }

    /// Value factor.
    pub fn hml(&self) -> &[f64] {
        &self.hml
    }
}

/// Pair a stock's monthly returns with the index returns of the same months.
///
/// Months are limited to `range` when given; a month is kept only when both
/// series have a value. Used for the stock-versus-index scatter charts, which
/// plot raw returns rather than excess returns.
pub fn paired_returns(
    stock: &ReturnSeries,
    index: &ReturnSeries,
    range: Option<(NaiveDate, NaiveDate)>,
) -> Vec<(NaiveDate, f64, f64)> {
    stock
        .iter()
        .filter(|(date, _)| range.is_none_or(|(start, end)| *date >= start && *date <= end))
        .filter_map(|(date, s)| index.get(date).map(|i| (date, s, i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn m(y: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, month, 1).unwrap()
    }

    fn series(symbol: &str, points: &[(NaiveDate, f64)]) -> ReturnSeries {
        ReturnSeries::from_points(symbol, points.iter().copied())
    }

    fn factors(months: &[NaiveDate]) -> FactorTable {
        months
            .iter()
            .enumerate()
            .map(|(i, d)| (*d, FactorRow::new(0.01 * i as f64, 0.002, -0.001, 0.001)))
            .collect()
    }

    #[test]
    fn test_overlapping_range() {
        let range = overlapping_range([
            Some((m(2020, 1), m(2024, 12))),
            Some((m(2021, 6), m(2025, 3))),
            Some((m(2019, 1), m(2023, 1))),
        ]);
        assert_eq!(range, Some((m(2021, 6), m(2023, 1))));

        assert_eq!(
            overlapping_range([Some((m(2020, 1), m(2020, 6))), Some((m(2021, 1), m(2021, 6)))]),
            None
        );
        assert_eq!(overlapping_range([Some((m(2020, 1), m(2020, 6))), None]), None);
    }

    #[test]
    fn test_disjoint_series_give_empty_panel() {
        let stock = series("BKT.MC", &[(m(2020, 1), 0.01), (m(2020, 2), 0.02)]);
        let index = series("^IBEX", &[(m(2022, 1), 0.01), (m(2022, 2), 0.02)]);
        let table = factors(&[m(2020, 1), m(2020, 2), m(2022, 1), m(2022, 2)]);

        let panel = MergedPanel::merge(&[stock], &index, &table);
        assert!(panel.is_empty());
        assert!(panel.excess_returns().valid_stocks().is_empty());
    }

    #[test]
    fn test_rows_missing_any_column_are_dropped() {
        let bkt = series(
            "BKT.MC",
            &[(m(2023, 1), 0.01), (m(2023, 2), 0.02), (m(2023, 3), 0.03), (m(2023, 4), 0.04)],
        );
        // ENG.MC has no March return.
        let eng = series(
            "ENG.MC",
            &[(m(2023, 1), 0.05), (m(2023, 2), 0.06), (m(2023, 4), 0.08)],
        );
        // The index has no February return.
        let index = series(
            "^IBEX",
            &[(m(2023, 1), 0.1), (m(2023, 3), 0.3), (m(2023, 4), 0.4)],
        );
        // Factors stop before April.
        let table = factors(&[m(2023, 1), m(2023, 2), m(2023, 3)]);

        let panel = MergedPanel::merge(&[bkt, eng], &index, &table);
        assert_eq!(panel.dates(), &[m(2023, 1)]);
        assert_eq!(panel.stock("BKT.MC"), Some(&[0.01][..]));
        assert_eq!(panel.stock("ENG.MC"), Some(&[0.05][..]));
        assert_eq!(panel.index(), &[0.1]);
    }

    #[test]
    fn test_every_row_is_complete() {
        let months: Vec<NaiveDate> = (1..=12).map(|mo| m(2022, mo)).collect();
        let bkt = series(
            "BKT.MC",
            &months
                .iter()
                .filter(|d| *d != &m(2022, 5))
                .map(|d| (*d, 0.01))
                .collect::<Vec<_>>(),
        );
        let index = series(
            "^IBEX",
            &months[2..].iter().map(|d| (*d, 0.02)).collect::<Vec<_>>(),
        );
        let table = factors(&months[..10]);

        let panel = MergedPanel::merge(&[bkt], &index, &table);
        for (i, date) in panel.dates().iter().enumerate() {
            assert!(*date >= m(2022, 3) && *date <= m(2022, 10));
            assert_ne!(*date, m(2022, 5));
            assert!(panel.stock("BKT.MC").unwrap()[i].is_finite());
            assert!(panel.index()[i].is_finite());
            assert_eq!(panel.factors()[i], *table.get(*date).unwrap());
        }
        assert_eq!(panel.len(), 7);
    }

    #[test]
    fn test_stock_without_returns_is_excluded_without_emptying_panel() {
        let bkt = series("BKT.MC", &[(m(2023, 1), 0.01), (m(2023, 2), 0.02)]);
        let ana = ReturnSeries::new("ANA.MC");
        let col = series("COL.MC", &[(m(2023, 1), 0.03), (m(2023, 2), 0.04)]);
        let index = series("^IBEX", &[(m(2023, 1), 0.1), (m(2023, 2), 0.2)]);
        let table = factors(&[m(2023, 1), m(2023, 2)]);

        let panel = MergedPanel::merge(&[bkt, ana, col], &index, &table);
        assert_eq!(panel.len(), 2);
        assert_eq!(panel.stock("ANA.MC"), None);
        assert_eq!(panel.column_count(), 2 + 1 + 4);

        let excess = panel.excess_returns();
        assert_eq!(excess.valid_stocks(), vec!["BKT.MC", "COL.MC"]);
        assert_eq!(excess.excluded_stocks(), &["ANA.MC".to_string()]);
    }

    #[test]
    fn test_excess_returns_subtract_risk_free() {
        let bkt = series("BKT.MC", &[(m(2023, 1), 0.05), (m(2023, 2), -0.02)]);
        let index = series("^IBEX", &[(m(2023, 1), 0.03), (m(2023, 2), 0.01)]);
        let table: FactorTable = [
            (m(2023, 1), FactorRow::new(0.02, 0.004, -0.003, 0.001)),
            (m(2023, 2), FactorRow::new(0.01, 0.002, 0.001, 0.002)),
        ]
        .into_iter()
        .collect();

        let excess = MergedPanel::merge(&[bkt], &index, &table).excess_returns();
        let stock = excess.stock("BKT.MC").unwrap();
        assert_abs_diff_eq!(stock[0], 0.049, epsilon = 1e-12);
        assert_abs_diff_eq!(stock[1], -0.022, epsilon = 1e-12);
        assert_abs_diff_eq!(excess.market()[0], 0.029, epsilon = 1e-12);
        assert_abs_diff_eq!(excess.market()[1], 0.008, epsilon = 1e-12);
        assert_eq!(excess.smb(), &[0.004, 0.002]);
        assert_eq!(excess.hml(), &[-0.003, 0.001]);
    }

    #[test]
    fn test_empty_factor_table_gives_empty_panel() {
        let bkt = series("BKT.MC", &[(m(2023, 1), 0.05)]);
        let index = series("^IBEX", &[(m(2023, 1), 0.03)]);

        let panel = MergedPanel::merge(&[bkt], &index, &FactorTable::new());
        assert!(panel.is_empty());
        assert_eq!(panel.excess_returns().excluded_stocks(), &["BKT.MC".to_string()]);
    }

    #[test]
    fn test_headers_records_and_dataframe_agree() {
        let bkt = series("BKT.MC", &[(m(2023, 1), 0.05), (m(2023, 2), 0.01)]);
        let eng = ReturnSeries::new("ENG.MC");
        let index = series("^IBEX", &[(m(2023, 1), 0.03), (m(2023, 2), 0.02)]);
        let table = factors(&[m(2023, 1), m(2023, 2)]);

        let panel = MergedPanel::merge(&[bkt, eng], &index, &table);
        let headers = panel.headers();
        assert_eq!(
            headers,
            vec!["Date", "BKT.MC", "^IBEX", "Mkt-RF", "SMB", "HML", "RF"]
        );

        let records = panel.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.len() == headers.len()));
        assert_eq!(records[0][0], "2023-01-01");

        let df = panel.to_dataframe().unwrap();
        assert_eq!(df.shape(), (2, headers.len()));
    }

    #[test]
    fn test_paired_returns() {
        let stock = series(
            "LOG.MC",
            &[(m(2023, 1), 0.01), (m(2023, 2), 0.02), (m(2023, 3), 0.03)],
        );
        let index = series("^IBEX", &[(m(2023, 2), 0.2), (m(2023, 3), 0.3)]);

        let all = paired_returns(&stock, &index, None);
        assert_eq!(all, vec![(m(2023, 2), 0.02, 0.2), (m(2023, 3), 0.03, 0.3)]);

        let clamped = paired_returns(&stock, &index, Some((m(2023, 1), m(2023, 2))));
        assert_eq!(clamped, vec![(m(2023, 2), 0.02, 0.2)]);
    }
}
