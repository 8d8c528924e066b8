use thiserror::Error;

/// Errors raised while building pipeline stages. Any of them aborts startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid mapping payload: {0}")]
    MappingPayload(#[source] serde_json::Error),
    #[error("invalid pipeline configuration: {0}")]
    Pipeline(#[source] serde_json::Error),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("stage {0} has an empty attribute name")]
    EmptyAttribute(&'static str),
}
