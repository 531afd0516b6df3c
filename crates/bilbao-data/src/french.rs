//! Fama-French factor file loader.
//!
//! Reads the CSV files published in Kenneth French's data library (for example
//! `Europe_3_Factors.csv`). Those files open with a free-text preamble, then a
//! header line whose first column is unnamed, then monthly rows keyed by a
//! `YYYYMM` token. Further sections (annual factors, copyright lines) follow the
//! monthly block and are filtered out by the token rule.
//!
//! Values in the file are percentage points; the loader returns fractions.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// Number of descriptive lines before the header line.
pub const PREAMBLE_LINES: usize = 6;

/// Header names of the four factor columns, in [`FactorRow`] field order.
pub const FACTOR_COLUMNS: [&str; 4] = ["Mkt-RF", "SMB", "HML", "RF"];

/// One month of factor returns, as decimal fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorRow {
    /// Market return in excess of the risk-free rate (`Mkt-RF`).
    pub mkt_rf: f64,
    /// Small-minus-big size factor (`SMB`).
    pub smb: f64,
    /// High-minus-low value factor (`HML`).
    pub hml: f64,
    /// Risk-free rate (`RF`).
    pub rf: f64,
}

impl FactorRow {
    /// Create a row from fractional values.
    pub const fn new(mkt_rf: f64, smb: f64, hml: f64, rf: f64) -> Self {
        Self {
            mkt_rf,
            smb,
            hml,
            rf,
        }
    }

    /// Create a row from percentage-point values, as stored in the source file.
    pub fn from_percent(values: [f64; 4]) -> Self {
        let [mkt_rf, smb, hml, rf] = values.map(|v| v / 100.0);
        Self::new(mkt_rf, smb, hml, rf)
    }
}

/// Monthly factor rows keyed by month-start date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorTable {
    rows: BTreeMap<NaiveDate, FactorRow>,
}

impl FactorTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }

    /// Insert a row. Returns `false` if the month was already present, in which
    /// case the existing row is kept.
    pub fn insert(&mut self, month: NaiveDate, row: FactorRow) -> bool {
        if self.rows.contains_key(&month) {
            return false;
        }
        self.rows.insert(month, row);
        true
    }

    /// Row for a month-start date.
    pub fn get(&self, month: NaiveDate) -> Option<&FactorRow> {
        self.rows.get(&month)
    }

    /// Number of months.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First and last month, or `None` for an empty table.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.rows.keys().next()?;
        let last = self.rows.keys().next_back()?;
        Some((*first, *last))
    }

    /// Rows in date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &FactorRow)> {
        self.rows.iter().map(|(d, r)| (*d, r))
    }
}

impl FromIterator<(NaiveDate, FactorRow)> for FactorTable {
    fn from_iter<T: IntoIterator<Item = (NaiveDate, FactorRow)>>(iter: T) -> Self {
        let mut table = Self::new();
        for (month, row) in iter {
            table.insert(month, row);
        }
        table
    }
}

/// Parse a `YYYYMM` token into the first day of that month.
///
/// The token must be exactly six ASCII digits after trimming and name a real
/// calendar month; anything else yields `None`.
///
/// ```
/// use bilbao_data::french::parse_month_token;
/// use chrono::NaiveDate;
///
/// assert_eq!(parse_month_token("202301"), NaiveDate::from_ymd_opt(2023, 1, 1));
/// assert_eq!(parse_month_token("20231"), None);
/// assert_eq!(parse_month_token("2023-01"), None);
/// ```
pub fn parse_month_token(token: &str) -> Option<NaiveDate> {
    let token = token.trim();
    if token.len() != 6 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = token[..4].parse().ok()?;
    let month: u32 = token[4..].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Load a factor file from disk.
pub fn load_factor_file<P: AsRef<Path>>(path: P) -> Result<FactorTable> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let table = parse_factor_csv(file)?;

    match table.date_range() {
        Some((first, last)) => info!(
            path = %path.display(),
            months = table.len(),
            %first,
            %last,
            "loaded factor file"
        ),
        None => info!(path = %path.display(), "factor file has no monthly rows"),
    }

    Ok(table)
}

/// Parse factor CSV content.
///
/// Skips [`PREAMBLE_LINES`] lines, reads the header, and keeps only rows whose
/// first field is a valid `YYYYMM` token and whose four factor fields all parse
/// as finite numbers. Fields are decoded one at a time, so a row with bytes
/// that are not UTF-8 is excluded like any other malformed row. A header
/// without one of [`FACTOR_COLUMNS`] is an error.
pub fn parse_factor_csv<R: Read>(reader: R) -> Result<FactorTable> {
    let mut reader = BufReader::new(reader);
    let mut discarded = Vec::new();
    for _ in 0..PREAMBLE_LINES {
        discarded.clear();
        if reader.read_until(b'\n', &mut discarded)? == 0 {
            break;
        }
    }

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.byte_headers()?.clone();
    let mut indices = [0usize; 4];
    for (slot, name) in indices.iter_mut().zip(FACTOR_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h == name.as_bytes())
            .ok_or_else(|| DataError::MissingFactorColumn(name.to_string()))?;
    }

    let mut table = FactorTable::new();
    let mut skipped = 0usize;

    for record in csv_reader.byte_records() {
        let record = record?;
        let field = |idx: usize| record.get(idx).and_then(|b| std::str::from_utf8(b).ok());
        let Some(month) = field(0).and_then(parse_month_token) else {
            skipped += 1;
            continue;
        };

        let values = indices.map(|idx| {
            field(idx)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
        });
        let [Some(mkt_rf), Some(smb), Some(hml), Some(rf)] = values else {
            skipped += 1;
            continue;
        };

        if !table.insert(month, FactorRow::from_percent([mkt_rf, smb, hml, rf])) {
            debug!(%month, "duplicate factor month, keeping first row");
        }
    }

    debug!(rows = table.len(), skipped, "parsed factor rows");
    Ok(table)
}
