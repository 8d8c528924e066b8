//! Signed claims release for bearer token holders.
//!
//! `ClaimsService` ties together the injected collaborators: a token verifier,
//! a claims store, the scope release rules and the signing key. All of them are
//! built once at startup; the service itself keeps no per-request state.

mod error;
pub mod introspection;
pub mod scope;
pub mod signer;
pub mod store;
pub mod verifier;

pub use error::{SetupError, SignError, TokenError};
pub use introspection::IntrospectionVerifier;
pub use scope::ScopePolicy;
pub use signer::ClaimsSigner;
pub use store::{ClaimsStore, MemoryClaimsStore};
pub use verifier::{AccessGrant, StaticTokenVerifier, TokenVerifier};

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

pub type Claims = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum ReleaseError {
    /// The presented token cannot be used; reported as `invalid_token`.
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Sign(#[from] SignError),
}

#[derive(Clone)]
pub struct ClaimsService {
    verifier: Arc<dyn TokenVerifier>,
    store: Arc<dyn ClaimsStore>,
    scopes: ScopePolicy,
    signer: ClaimsSigner,
}

impl ClaimsService {
    #[must_use]
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        store: Arc<dyn ClaimsStore>,
        scopes: ScopePolicy,
        signer: ClaimsSigner,
    ) -> Self {
        Self {
            verifier,
            store,
            scopes,
            signer,
        }
    }

    /// Validate `token` and return the signed claims assertion for its subject.
    ///
    /// # Errors
    ///
    /// `ReleaseError::Token` when the token is rejected at any step,
    /// `ReleaseError::Sign` if the assertion cannot be encoded.
    #[instrument(skip_all)]
    pub async fn release(&self, token: &str) -> Result<String, ReleaseError> {
        let grant = self.verifier.verify(token).await?;
        debug!(subject = %grant.subject, scopes = ?grant.scopes, "access token accepted");

        let claims = self.store.claims(&grant.subject).await?;
        let released = self.scopes.release(&grant, &claims)?;

        Ok(self
            .signer
            .sign(released, grant.client_id.as_deref(), Utc::now().timestamp())?)
    }
}

impl std::fmt::Debug for ClaimsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimsService")
            .field("scopes", &self.scopes)
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}
