use std::collections::HashSet;
use crate::error::{Error, Result};
use crate::types::index::IndexDefinition;

/// Fixed, ordered set of tracked indices. Built once at startup.
#[derive(Clone, Debug)]
pub struct IndexRegistry {
    indices: Vec<IndexDefinition>,
}

impl IndexRegistry {
    /// Rejects an empty list and duplicate names; both are configuration errors.
    pub fn new(indices: Vec<IndexDefinition>) -> Result<Self> {
        if indices.is_empty() {
            return Err(Error::EmptyRegistry);
        }

        let mut seen = HashSet::new();
        for index in &indices {
            if index.name.trim().is_empty() || index.symbol.trim().is_empty() {
                return Err(Error::ConfigError(format!(
                    "index entry has empty name or symbol: {:?}",
                    index
                )));
            }
            if !seen.insert(index.name.as_str()) {
                return Err(Error::DuplicateIndex(index.name.clone()));
            }
        }

        Ok(IndexRegistry { indices })
    }

    /// Insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &IndexDefinition> {
        self.indices.iter()
    }

    pub fn symbol_for(&self, name: &str) -> Option<&str> {
        self.indices.iter()
            .find(|i| i.name == name)
            .map(|i| i.symbol.as_str())
    }

    pub fn names(&self) -> Vec<&str> {
        self.indices.iter().map(|i| i.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

pub fn default_indices() -> Vec<IndexDefinition> {
    vec![
        IndexDefinition::new("Dow Jones", "^DJI"),
        IndexDefinition::new("S&P 500", "^GSPC"),
        IndexDefinition::new("NASDAQ", "^IXIC"),
        IndexDefinition::new("NIFTY 50", "^NSEI"),
        IndexDefinition::new("SENSEX", "^BSESN"),
        IndexDefinition::new("BANK NIFTY", "^NSEBANK"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let registry = IndexRegistry::new(default_indices()).unwrap();
        assert_eq!(
            registry.names(),
            vec!["Dow Jones", "S&P 500", "NASDAQ", "NIFTY 50", "SENSEX", "BANK NIFTY"]
        );
        assert_eq!(registry.symbol_for("SENSEX"), Some("^BSESN"));
        assert_eq!(registry.symbol_for("FTSE"), None);
    }

    #[test]
    fn empty_registry_is_rejected() {
        assert!(matches!(IndexRegistry::new(vec![]), Err(Error::EmptyRegistry)));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = IndexRegistry::new(vec![
            IndexDefinition::new("A", "^A"),
            IndexDefinition::new("A", "^B"),
        ]);
        assert!(matches!(result, Err(Error::DuplicateIndex(name)) if name == "A"));
    }

    #[test]
    fn blank_symbol_is_rejected() {
        let result = IndexRegistry::new(vec![IndexDefinition::new("A", " ")]);
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }
}
