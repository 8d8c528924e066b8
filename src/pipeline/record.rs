use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Attributes released for one authentication exchange, keyed by attribute name.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// A single attribute value as received from the upstream identity provider.
///
/// Serialized untagged, so the JSON form is the plain value:
/// `"Dupont"`, `["Jean", "Pierre"]`, `42`, ...
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum AttributeValue {
    Scalar(String),
    Sequence(Vec<String>),
    /// Anything that is neither a string nor a list of strings.
    Other(serde_json::Value),
}

impl AttributeValue {
    #[must_use]
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(values: Vec<String>) -> Self {
        Self::Sequence(values)
    }
}

/// One in-flight authentication exchange travelling through the pipeline.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AuthenticationRecord {
    /// Upstream identity provider (entity ID); empty during the request phase.
    #[serde(default)]
    pub issuer: String,
    /// Downstream relying party that started the exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl AuthenticationRecord {
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}
