//! Derive an organizational code (SIRET) from the upstream issuer.

use crate::pipeline::{AttributeValue, AuthenticationRecord, ConfigError, Flow, MappingTable};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_TARGET_ATTRIBUTE: &str = "siret";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssuerMapperConfig {
    #[serde(default = "default_attribute")]
    pub attribute: String,
    /// JSON object of `"issuer": "code"` pairs, kept as a string.
    #[serde(default = "default_mapping_json")]
    pub mapping_json: String,
}

fn default_attribute() -> String {
    DEFAULT_TARGET_ATTRIBUTE.to_string()
}

fn default_mapping_json() -> String {
    "{}".to_string()
}

impl Default for IssuerMapperConfig {
    fn default() -> Self {
        Self {
            attribute: default_attribute(),
            mapping_json: default_mapping_json(),
        }
    }
}

/// Response stage setting `attribute` from the issuer → code table.
#[derive(Clone, Debug)]
pub struct IssuerMapper {
    attribute: String,
    mapping: MappingTable,
}

impl IssuerMapper {
    /// # Errors
    ///
    /// Returns an error if the target attribute is empty or the mapping payload
    /// is not a JSON object of strings.
    pub fn new(config: &IssuerMapperConfig) -> Result<Self, ConfigError> {
        let mapping = MappingTable::from_json(&config.mapping_json)?;
        Self::with_table(config.attribute.clone(), mapping)
    }

    /// # Errors
    ///
    /// Returns an error if `attribute` is empty.
    pub fn with_table(attribute: String, mapping: MappingTable) -> Result<Self, ConfigError> {
        if attribute.is_empty() {
            return Err(ConfigError::EmptyAttribute("issuer_mapping"));
        }

        Ok(Self { attribute, mapping })
    }

    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Never stops the pipeline: an unmapped issuer is only logged.
    pub fn apply(&self, record: &mut AuthenticationRecord) -> Flow {
        let issuer = record.issuer.as_str();

        if let Some(code) = self.mapping.lookup(issuer) {
            info!(issuer, mapped_value = code, "mapping issuer to {}", self.attribute);
            record
                .attributes
                .insert(self.attribute.clone(), AttributeValue::Scalar(code.to_string()));
        } else {
            warn!(issuer, "no {} mapping found for issuer", self.attribute);
        }

        Flow::Continue
    }
}
