use thiserror::Error;

/// Why a bearer token presentation was rejected.
///
/// Every variant surfaces to the caller as `invalid_token`; the display string
/// becomes the `error_description`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("missing bearer token")]
    Missing,
    #[error("malformed bearer token")]
    Malformed,
    #[error("invalid access token: {0}")]
    Invalid(String),
    #[error("access token expired")]
    Expired,
    #[error("access token revoked")]
    Revoked,
    #[error("unknown subject")]
    UnknownSubject,
    #[error("token verification unavailable: {0}")]
    Unavailable(String),
}

/// Failures while loading verifiers, claims or signing keys at startup.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse RSA signing key")]
    KeyParse,
    #[error("invalid introspection endpoint: {0}")]
    Endpoint(String),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum SignError {
    #[error("failed to encode claims: {0}")]
    Json(#[from] serde_json::Error),
}
