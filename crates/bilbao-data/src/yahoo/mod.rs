//! Yahoo Finance data provider.

pub mod quotes;

pub use quotes::{QUOTE_COLUMNS, YahooQuoteProvider};
