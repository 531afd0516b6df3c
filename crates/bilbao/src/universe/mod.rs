//! Ticker universes.
//!
//! A universe names the market index and the stocks regressed against it.

pub mod ibex;

pub use ibex::{Constituent, IbexUniverse};

/// Trait for stock universes.
pub trait Universe {
    /// Market index symbol.
    fn index(&self) -> &str;

    /// Stock symbols, in analysis order.
    fn symbols(&self) -> Vec<String>;

    /// All symbols to download: the stocks followed by the index.
    fn download_symbols(&self) -> Vec<String> {
        let mut symbols = self.symbols();
        symbols.push(self.index().to_string());
        symbols
    }

    /// Check if a symbol is in the universe.
    fn contains(&self, symbol: &str) -> bool {
        self.symbols().iter().any(|s| s == symbol)
    }

    /// Get the number of stocks.
    fn size(&self) -> usize {
        self.symbols().len()
    }
}

impl Universe for IbexUniverse {
    fn index(&self) -> &str {
        self.index_symbol()
    }

    fn symbols(&self) -> Vec<String> {
        self.symbols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universe_trait() {
        let universe = IbexUniverse::new();

        assert!(universe.contains("BKT.MC"));
        assert!(!universe.contains("^IBEX"));
        assert_eq!(universe.size(), 5);
        assert_eq!(universe.download_symbols().last().map(String::as_str), Some("^IBEX"));
    }
}
