//! Attribute micro-service pipeline.
//!
//! An authentication record flows through an ordered list of stages. Request
//! stages run before the upstream identity provider is contacted, response
//! stages run once it has returned attributes and before they are released to
//! the relying party. Each stage mutates the record in place and either lets it
//! continue or stops the exchange with a terminal response.
//!
//! Stages own only their construction-time configuration, so a `Pipeline` is
//! shared behind an `Arc` and every run is independent of the others.

pub mod config;
mod error;
pub mod flatten;
pub mod issuer;
mod mapping;
pub mod record;

pub use config::{PipelineConfig, StageConfig};
pub use error::ConfigError;
pub use flatten::{flatten, FlattenError, FlattenStage, ShapePolicy};
pub use issuer::{IssuerMapper, IssuerMapperConfig, DEFAULT_TARGET_ATTRIBUTE};
pub use mapping::MappingTable;
pub use record::{AttributeValue, Attributes, AuthenticationRecord};

use axum::{
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, info, instrument};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Request,
    Response,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => f.write_str("request"),
            Self::Response => f.write_str("response"),
        }
    }
}

/// Ambient per-request data handed to every stage.
#[derive(Clone, Debug)]
pub struct Context {
    pub request_id: String,
    pub phase: Phase,
}

impl Context {
    #[must_use]
    pub fn new(request_id: impl Into<String>, phase: Phase) -> Self {
        Self {
            request_id: request_id.into(),
            phase,
        }
    }
}

/// Terminal response produced by a stage that declined to forward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Halt {
    pub stage: String,
    pub status: StatusCode,
    pub content_type: String,
    pub body: String,
}

impl Halt {
    #[must_use]
    pub fn new(stage: impl Into<String>, status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            status,
            content_type: "text/plain; charset=utf-8".to_string(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

impl IntoResponse for Halt {
    fn into_response(self) -> Response {
        (self.status, [(CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

/// What a stage tells the executor after processing a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop(Halt),
}

/// Extension point for stages provided by the surrounding broker.
pub trait Microservice: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, record: &mut AuthenticationRecord, ctx: &Context) -> Flow;
}

#[derive(Clone)]
pub enum Stage {
    IssuerMapping(IssuerMapper),
    Flatten(FlattenStage),
    Custom(Arc<dyn Microservice>),
}

impl Stage {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::IssuerMapping(_) => "issuer_mapping",
            Self::Flatten(_) => "flatten",
            Self::Custom(service) => service.name(),
        }
    }

    pub fn apply(&self, record: &mut AuthenticationRecord, ctx: &Context) -> Flow {
        match self {
            Self::IssuerMapping(mapper) => mapper.apply(record),
            Self::Flatten(stage) => stage.apply(record),
            Self::Custom(service) => service.apply(record, ctx),
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IssuerMapping(mapper) => f.debug_tuple("IssuerMapping").field(mapper).finish(),
            Self::Flatten(stage) => f.debug_tuple("Flatten").field(stage).finish(),
            Self::Custom(service) => f.debug_tuple("Custom").field(&service.name()).finish(),
        }
    }
}

/// Result of running one phase of the pipeline.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// Every stage forwarded; carry on with the (possibly mutated) record.
    Forward(AuthenticationRecord),
    /// A stage stopped the exchange; its response is the final answer.
    Halted(Halt),
}

#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    request: Vec<Stage>,
    response: Vec<Stage>,
}

impl Pipeline {
    #[must_use]
    pub fn new(request: Vec<Stage>, response: Vec<Stage>) -> Self {
        Self { request, response }
    }

    /// Build every configured stage, failing on the first invalid one.
    ///
    /// # Errors
    ///
    /// Returns the `ConfigError` of the first stage that cannot be built.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        let request = config
            .request
            .iter()
            .map(StageConfig::build)
            .collect::<Result<Vec<_>, _>>()?;
        let response = config
            .response
            .iter()
            .map(StageConfig::build)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(request, response))
    }

    #[must_use]
    pub fn stages(&self, phase: Phase) -> &[Stage] {
        match phase {
            Phase::Request => &self.request,
            Phase::Response => &self.response,
        }
    }

    /// Thread `record` through the stages of `ctx.phase`, in declared order.
    #[instrument(skip_all, fields(phase = %ctx.phase, request_id = %ctx.request_id))]
    pub fn run(&self, mut record: AuthenticationRecord, ctx: &Context) -> Outcome {
        for stage in self.stages(ctx.phase) {
            debug!(stage = stage.name(), "applying stage");

            if let Flow::Stop(halt) = stage.apply(&mut record, ctx) {
                info!(stage = %halt.stage, status = %halt.status, "pipeline stopped");
                return Outcome::Halted(halt);
            }
        }

        Outcome::Forward(record)
    }
}
