use serde::{Deserialize, Serialize};

/// A tracked index: human-readable name (the document key) and provider ticker.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct IndexDefinition {
    pub name: String,
    pub symbol: String,
}

impl IndexDefinition {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        IndexDefinition {
            name: name.into(),
            symbol: symbol.into(),
        }
    }
}
