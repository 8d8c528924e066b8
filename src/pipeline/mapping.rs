use crate::pipeline::ConfigError;
use std::{collections::HashMap, sync::Arc};

/// Immutable issuer → organizational code table.
///
/// Built once from a JSON object payload and shared read-only between every
/// request handler; cloning only bumps a reference count.
#[derive(Clone, Debug, Default)]
pub struct MappingTable {
    entries: Arc<HashMap<String, String>>,
}

impl MappingTable {
    /// Parse a JSON object of `"issuer": "code"` pairs.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MappingPayload` if the payload is not a JSON object
    /// whose values are all strings.
    pub fn from_json(payload: &str) -> Result<Self, ConfigError> {
        let entries: HashMap<String, String> =
            serde_json::from_str(payload).map_err(ConfigError::MappingPayload)?;

        Ok(Self::from(entries))
    }

    /// Exact match only; a miss is a normal outcome.
    #[must_use]
    pub fn lookup(&self, issuer: &str) -> Option<&str> {
        self.entries.get(issuer).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<HashMap<String, String>> for MappingTable {
    fn from(entries: HashMap<String, String>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }
}
