//! # oidc2fer
//!
//! Extensions for a SAML/OIDC identity broker federating French research and
//! education identity providers.
//!
//! ## Attribute pipeline
//!
//! Every authentication record crossing the broker goes through an ordered list
//! of stages, one list per phase (`request`, `response`). The built-in stages
//! are:
//!
//! - **Issuer mapping:** look up the identity provider's entity ID in a static
//!   table and set a target attribute (a SIRET number by default).
//! - **Flattening:** collapse multi-valued attributes into one space-joined
//!   string.
//!
//! A stage may stop the pipeline with an HTTP response; later stages are not
//! run.
//!
//! ## Signed userinfo
//!
//! `/userinfo` accepts an RFC 6750 bearer token, verifies it, releases the
//! claims its scopes allow and answers with an RS256-signed JWT
//! (`application/jwt`). Any token problem is a `401 invalid_token`.

pub mod broker;
pub mod claims;
pub mod cli;
pub mod pipeline;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
