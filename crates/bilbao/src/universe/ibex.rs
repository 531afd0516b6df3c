//! IBEX 35 universe.

/// A stock in the universe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constituent {
    /// Yahoo Finance symbol.
    pub symbol: String,
    /// Company name, when known.
    pub name: Option<String>,
}

impl Constituent {
    /// Create a new constituent.
    pub fn new(symbol: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.map(str::to_string),
        }
    }
}

/// Default market index.
pub const DEFAULT_INDEX: &str = "^IBEX";

/// Spanish equities analysed against the IBEX 35.
#[derive(Debug, Clone)]
pub struct IbexUniverse {
    index: String,
    constituents: Vec<Constituent>,
}

impl Default for IbexUniverse {
    fn default() -> Self {
        Self::new()
    }
}

impl IbexUniverse {
    /// Create the universe with its default constituents.
    pub fn new() -> Self {
        Self {
            index: DEFAULT_INDEX.to_string(),
            constituents: Self::default_constituents(),
        }
    }

    /// Create a universe from explicit symbols.
    ///
    /// Symbols are trimmed and upper-cased; blanks, repeats and the index
    /// itself are dropped, keeping first occurrences in order.
    pub fn with_symbols<I, S>(index: &str, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let index = index.trim().to_uppercase();
        let mut constituents: Vec<Constituent> = Vec::new();
        for symbol in symbols {
            let symbol = symbol.as_ref().trim().to_uppercase();
            if symbol.is_empty()
                || symbol == index
                || constituents.iter().any(|c| c.symbol == symbol)
            {
                continue;
            }
            let name = Self::default_constituents()
                .into_iter()
                .find(|c| c.symbol == symbol)
                .and_then(|c| c.name);
            constituents.push(Constituent {
                symbol,
                name,
            });
        }

        Self {
            index,
            constituents,
        }
    }

    /// Market index symbol.
    pub fn index_symbol(&self) -> &str {
        &self.index
    }

    /// Get all constituents.
    pub fn constituents(&self) -> &[Constituent] {
        &self.constituents
    }

    /// Get all symbols.
    pub fn symbols(&self) -> Vec<String> {
        self.constituents.iter().map(|c| c.symbol.clone()).collect()
    }

    /// Company name for a symbol.
    pub fn name(&self, symbol: &str) -> Option<&str> {
        self.constituents
            .iter()
            .find(|c| c.symbol == symbol)
            .and_then(|c| c.name.as_deref())
    }

    fn default_constituents() -> Vec<Constituent> {
        vec![
            Constituent::new("BKT.MC", Some("Bankinter")),
            Constituent::new("ENG.MC", Some("Enagás")),
            Constituent::new("ANA.MC", Some("Acciona")),
            Constituent::new("COL.MC", Some("Inmobiliaria Colonial")),
            Constituent::new("LOG.MC", Some("Logista")),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_universe() {
        let universe = IbexUniverse::new();
        assert_eq!(universe.index_symbol(), "^IBEX");
        assert_eq!(
            universe.symbols(),
            vec!["BKT.MC", "ENG.MC", "ANA.MC", "COL.MC", "LOG.MC"]
        );
        assert_eq!(universe.name("ANA.MC"), Some("Acciona"));
    }

    #[test]
    fn test_with_symbols_normalizes() {
        let universe =
            IbexUniverse::with_symbols("^ibex", [" bkt.mc", "SAN.MC", "BKT.MC", "", "^IBEX"]);
        assert_eq!(universe.index_symbol(), "^IBEX");
        assert_eq!(universe.symbols(), vec!["BKT.MC", "SAN.MC"]);
        assert_eq!(universe.name("BKT.MC"), Some("Bankinter"));
        assert_eq!(universe.name("SAN.MC"), None);
    }
}
