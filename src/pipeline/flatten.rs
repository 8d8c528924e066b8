//! Multi-valued → scalar attribute normalization.
//!
//! Upstream SAML providers send most attributes as lists even when they hold a
//! single value; OIDC relying parties expect plain strings for claims such as
//! `given_name`. A sequence is joined with single spaces, keeping its order.

use crate::pipeline::{AttributeValue, Attributes, AuthenticationRecord, Flow, Halt};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

/// How to treat a value that is neither a string nor a list of strings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapePolicy {
    /// Leave it untouched, as if it were already flat.
    #[default]
    Permissive,
    /// Report it as an error.
    Strict,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlattenError {
    #[error("attribute {attribute} has an unexpected shape")]
    UnexpectedShape { attribute: String },
}

/// Flatten `attribute` in place.
///
/// Absent attributes are ignored and no key is created. Scalars are kept as
/// is, so applying this twice gives the same result as applying it once.
///
/// # Errors
///
/// Only with `ShapePolicy::Strict`, when the value is neither a string nor a
/// list of strings.
pub fn flatten(
    attributes: &mut Attributes,
    attribute: &str,
    policy: ShapePolicy,
) -> Result<(), FlattenError> {
    let Some(value) = attributes.get_mut(attribute) else {
        return Ok(());
    };

    match value {
        AttributeValue::Sequence(values) => {
            let flattened = values.join(" ");
            debug!(
                attribute,
                original_values = ?values,
                flattened_value = %flattened,
                "flattening attribute"
            );
            *value = AttributeValue::Scalar(flattened);
            Ok(())
        }
        AttributeValue::Scalar(_) => Ok(()),
        AttributeValue::Other(_) => match policy {
            ShapePolicy::Permissive => Ok(()),
            ShapePolicy::Strict => Err(FlattenError::UnexpectedShape {
                attribute: attribute.to_string(),
            }),
        },
    }
}

/// Pipeline stage flattening a fixed list of attributes.
#[derive(Clone, Debug)]
pub struct FlattenStage {
    attributes: Vec<String>,
    policy: ShapePolicy,
}

impl FlattenStage {
    #[must_use]
    pub fn new(attributes: Vec<String>, policy: ShapePolicy) -> Self {
        Self { attributes, policy }
    }

    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    #[must_use]
    pub const fn policy(&self) -> ShapePolicy {
        self.policy
    }

    pub fn apply(&self, record: &mut AuthenticationRecord) -> Flow {
        for attribute in &self.attributes {
            if let Err(e) = flatten(&mut record.attributes, attribute, self.policy) {
                error!(issuer = %record.issuer, "{e}");
                return Flow::Stop(Halt::new(
                    "flatten",
                    StatusCode::INTERNAL_SERVER_ERROR,
                    e.to_string(),
                ));
            }
        }

        Flow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attributes(name: &str, value: AttributeValue) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert(name.to_string(), value);
        attributes
    }

    #[test]
    fn flattens_values() -> Result<(), FlattenError> {
        let mut attrs = attributes(
            "name",
            vec!["Albert".to_string(), "Betty".to_string()].into(),
        );
        flatten(&mut attrs, "name", ShapePolicy::Permissive)?;
        assert_eq!(attrs.get("name"), Some(&"Albert Betty".into()));
        Ok(())
    }

    #[test]
    fn ignores_missing_attribute() -> Result<(), FlattenError> {
        let mut attrs = Attributes::new();
        flatten(&mut attrs, "name", ShapePolicy::Strict)?;
        assert!(attrs.is_empty());
        Ok(())
    }

    #[test]
    fn leaves_string_alone() -> Result<(), FlattenError> {
        let mut attrs = attributes("name", "AlreadyFlat".into());
        flatten(&mut attrs, "name", ShapePolicy::Strict)?;
        assert_eq!(attrs.get("name"), Some(&"AlreadyFlat".into()));
        Ok(())
    }

    #[test]
    fn is_idempotent() -> Result<(), FlattenError> {
        let mut once = attributes(
            "given_name",
            vec!["Jean".to_string(), "Pierre".to_string()].into(),
        );
        flatten(&mut once, "given_name", ShapePolicy::Permissive)?;

        let mut twice = once.clone();
        flatten(&mut twice, "given_name", ShapePolicy::Permissive)?;

        assert_eq!(once, twice);
        Ok(())
    }

    #[test]
    fn empty_sequence_becomes_empty_string() -> Result<(), FlattenError> {
        let mut attrs = attributes("name", AttributeValue::Sequence(vec![]));
        flatten(&mut attrs, "name", ShapePolicy::Permissive)?;
        assert_eq!(attrs.get("name"), Some(&"".into()));
        Ok(())
    }

    #[test]
    fn only_touches_the_named_attribute() -> Result<(), FlattenError> {
        let mut attrs = attributes("name", vec!["A".to_string(), "B".to_string()].into());
        attrs.insert(
            "mail".to_string(),
            vec!["a@example.fr".to_string(), "b@example.fr".to_string()].into(),
        );
        flatten(&mut attrs, "name", ShapePolicy::Permissive)?;
        assert_eq!(
            attrs.get("mail"),
            Some(&AttributeValue::Sequence(vec![
                "a@example.fr".to_string(),
                "b@example.fr".to_string()
            ]))
        );
        Ok(())
    }

    #[test]
    fn unexpected_shape_depends_on_policy() {
        let odd = AttributeValue::Other(json!({"first": "Jean"}));

        let mut attrs = attributes("name", odd.clone());
        assert_eq!(flatten(&mut attrs, "name", ShapePolicy::Permissive), Ok(()));
        assert_eq!(attrs.get("name"), Some(&odd));

        let mut attrs = attributes("name", odd.clone());
        assert_eq!(
            flatten(&mut attrs, "name", ShapePolicy::Strict),
            Err(FlattenError::UnexpectedShape {
                attribute: "name".to_string()
            })
        );
        assert_eq!(attrs.get("name"), Some(&odd));
    }

    #[test]
    fn stage_flattens_every_configured_attribute() {
        let stage = FlattenStage::new(
            vec!["given_name".to_string(), "usual_name".to_string()],
            ShapePolicy::Permissive,
        );
        let mut record = AuthenticationRecord::new("https://idp.example.fr")
            .with_attribute("given_name", vec!["Jean".to_string(), "Pierre".to_string()])
            .with_attribute("usual_name", vec!["Dupont".to_string()]);

        assert_eq!(stage.apply(&mut record), Flow::Continue);
        assert_eq!(record.attributes.get("given_name"), Some(&"Jean Pierre".into()));
        assert_eq!(record.attributes.get("usual_name"), Some(&"Dupont".into()));
    }

    #[test]
    fn strict_stage_halts_on_unexpected_shape() {
        let stage = FlattenStage::new(vec!["age".to_string()], ShapePolicy::Strict);
        let mut record = AuthenticationRecord::new("https://idp.example.fr")
            .with_attribute("age", AttributeValue::Other(json!(42)));

        let Flow::Stop(halt) = stage.apply(&mut record) else {
            panic!("strict stage should stop");
        };
        assert_eq!(halt.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(halt.body, "attribute age has an unexpected shape");
    }
}
