use crate::pipeline::{
    ConfigError, FlattenStage, IssuerMapper, IssuerMapperConfig, ShapePolicy, Stage,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Declared stages for both phases, in execution order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub request: Vec<StageConfig>,
    #[serde(default)]
    pub response: Vec<StageConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum StageConfig {
    IssuerMapping {
        #[serde(default = "default_attribute")]
        attribute: String,
        #[serde(default = "default_mapping_json")]
        mapping_json: String,
    },
    Flatten {
        attributes: Vec<String>,
        #[serde(default)]
        shape_policy: ShapePolicy,
    },
}

fn default_attribute() -> String {
    IssuerMapperConfig::default().attribute
}

fn default_mapping_json() -> String {
    IssuerMapperConfig::default().mapping_json
}

impl PipelineConfig {
    /// # Errors
    ///
    /// Returns an error if the payload is not a valid pipeline declaration.
    pub fn from_json(payload: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(payload).map_err(ConfigError::Pipeline)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid pipeline declaration.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let payload = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json(&payload)
    }
}

impl StageConfig {
    /// # Errors
    ///
    /// Returns an error if the stage cannot be built from its settings.
    pub fn build(&self) -> Result<Stage, ConfigError> {
        match self {
            Self::IssuerMapping {
                attribute,
                mapping_json,
            } => IssuerMapper::new(&IssuerMapperConfig {
                attribute: attribute.clone(),
                mapping_json: mapping_json.clone(),
            })
            .map(Stage::IssuerMapping),
            Self::Flatten {
                attributes,
                shape_policy,
            } => {
                if attributes.iter().any(String::is_empty) {
                    return Err(ConfigError::EmptyAttribute("flatten"));
                }
                Ok(Stage::Flatten(FlattenStage::new(
                    attributes.clone(),
                    *shape_policy,
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{AuthenticationRecord, Context, Outcome, Phase, Pipeline};
    use std::io::Write;

    const CONFIG: &str = r#"{
        "request": [],
        "response": [
            {"type": "issuer_mapping", "mapping_json": "{\"https://idp.example.fr\": \"12345678200010\"}"},
            {"type": "flatten", "attributes": ["given_name"], "shape_policy": "strict"}
        ]
    }"#;

    #[test]
    fn parses_stage_declarations() -> Result<(), ConfigError> {
        let config = PipelineConfig::from_json(CONFIG)?;
        assert!(config.request.is_empty());
        assert_eq!(
            config.response,
            vec![
                StageConfig::IssuerMapping {
                    attribute: "siret".to_string(),
                    mapping_json: r#"{"https://idp.example.fr": "12345678200010"}"#.to_string(),
                },
                StageConfig::Flatten {
                    attributes: vec!["given_name".to_string()],
                    shape_policy: ShapePolicy::Strict,
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn builds_pipeline_in_declared_order() -> Result<(), ConfigError> {
        let pipeline = Pipeline::from_config(&PipelineConfig::from_json(CONFIG)?)?;
        let names: Vec<&str> = pipeline
            .stages(Phase::Response)
            .iter()
            .map(Stage::name)
            .collect();
        assert_eq!(names, vec!["issuer_mapping", "flatten"]);

        let record = AuthenticationRecord::new("https://idp.example.fr")
            .with_attribute("given_name", vec!["Jean".to_string(), "Pierre".to_string()]);
        let Outcome::Forward(record) =
            pipeline.run(record, &Context::new("req", Phase::Response))
        else {
            panic!("pipeline should forward");
        };
        assert_eq!(record.attributes.get("siret"), Some(&"12345678200010".into()));
        assert_eq!(record.attributes.get("given_name"), Some(&"Jean Pierre".into()));
        Ok(())
    }

    #[test]
    fn rejects_unknown_stage_and_fields() {
        for payload in [
            r#"{"response": [{"type": "teleport"}]}"#,
            r#"{"response": [{"type": "flatten", "attributes": [], "colour": "red"}]}"#,
            r#"{"responses": []}"#,
            r#"{"response": [{"type": "flatten"}]}"#,
        ] {
            assert!(
                matches!(PipelineConfig::from_json(payload), Err(ConfigError::Pipeline(_))),
                "payload should be rejected: {payload}"
            );
        }
    }

    #[test]
    fn malformed_mapping_fails_the_whole_pipeline() -> Result<(), ConfigError> {
        let config = PipelineConfig::from_json(
            r#"{"response": [{"type": "issuer_mapping", "mapping_json": "[1, 2]"}]}"#,
        )?;
        assert!(matches!(
            Pipeline::from_config(&config),
            Err(ConfigError::MappingPayload(_))
        ));
        Ok(())
    }

    #[test]
    fn empty_flatten_attribute_is_rejected() -> Result<(), ConfigError> {
        let config =
            PipelineConfig::from_json(r#"{"request": [{"type": "flatten", "attributes": [""]}]}"#)?;
        assert!(matches!(
            Pipeline::from_config(&config),
            Err(ConfigError::EmptyAttribute("flatten"))
        ));
        Ok(())
    }

    #[test]
    fn reads_from_file() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(CONFIG.as_bytes())?;

        let config = PipelineConfig::from_file(file.path())?;
        assert_eq!(config.response.len(), 2);

        let missing = PipelineConfig::from_file(Path::new("/nonexistent/pipeline.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
        Ok(())
    }
}
