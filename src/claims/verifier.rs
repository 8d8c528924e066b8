//! Bearer token verification.
//!
//! The endpoint only depends on the `TokenVerifier` trait; implementations are
//! built once at startup and shared by every request.

use crate::claims::{SetupError, TokenError};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path};

/// What a valid access token grants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub subject: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Unix timestamp, seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl AccessGrant {
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Validate a raw bearer token (without the `Bearer ` prefix).
    ///
    /// # Errors
    ///
    /// Returns a `TokenError` describing why the token is not acceptable.
    async fn verify(&self, token: &str) -> Result<AccessGrant, TokenError>;
}

#[derive(Clone, Debug, Deserialize)]
struct StaticToken {
    token: String,
    #[serde(flatten)]
    grant: AccessGrant,
    #[serde(default)]
    revoked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StaticTokenFile {
    tokens: Vec<StaticToken>,
}

/// Token → grant table loaded from a JSON file, for development and tests.
#[derive(Clone, Debug, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, (AccessGrant, bool)>,
}

impl StaticTokenVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, grant: AccessGrant) -> Self {
        self.tokens.insert(token.into(), (grant, false));
        self
    }

    #[must_use]
    pub fn with_revoked_token(mut self, token: impl Into<String>, grant: AccessGrant) -> Self {
        self.tokens.insert(token.into(), (grant, true));
        self
    }

    /// Load `{"tokens": [{"token": "...", "subject": "...", "scopes": [...]}]}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, SetupError> {
        let payload = fs::read_to_string(path).map_err(|source| SetupError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let file: StaticTokenFile =
            serde_json::from_str(&payload).map_err(|source| SetupError::Json {
                path: path.display().to_string(),
                source,
            })?;

        Ok(Self {
            tokens: file
                .tokens
                .into_iter()
                .map(|t| (t.token, (t.grant, t.revoked)))
                .collect(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn verify_at(&self, token: &str, now: i64) -> Result<AccessGrant, TokenError> {
        let (grant, revoked) = self
            .tokens
            .get(token)
            .ok_or_else(|| TokenError::Invalid("unknown access token".to_string()))?;

        if *revoked {
            return Err(TokenError::Revoked);
        }
        if grant.expires_at.is_some_and(|exp| exp <= now) {
            return Err(TokenError::Expired);
        }

        Ok(grant.clone())
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<AccessGrant, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const NOW: i64 = 1_700_000_000;

    fn grant(expires_at: Option<i64>) -> AccessGrant {
        AccessGrant {
            subject: "etudiant1".to_string(),
            scopes: vec!["openid".to_string(), "profile".to_string()],
            client_id: Some("client-123".to_string()),
            expires_at,
        }
    }

    #[test]
    fn accepts_known_token() {
        let verifier = StaticTokenVerifier::new().with_token("good", grant(Some(NOW + 60)));
        assert_eq!(verifier.verify_at("good", NOW), Ok(grant(Some(NOW + 60))));
    }

    #[test]
    fn rejects_unknown_expired_and_revoked() {
        let verifier = StaticTokenVerifier::new()
            .with_token("old", grant(Some(NOW)))
            .with_revoked_token("gone", grant(None));

        assert!(matches!(
            verifier.verify_at("nope", NOW),
            Err(TokenError::Invalid(_))
        ));
        assert_eq!(verifier.verify_at("old", NOW), Err(TokenError::Expired));
        assert_eq!(verifier.verify_at("gone", NOW), Err(TokenError::Revoked));
    }

    #[test]
    fn grant_scopes() {
        let grant = grant(None);
        assert!(grant.has_scope("openid"));
        assert!(!grant.has_scope("email"));
    }

    #[tokio::test]
    async fn loads_tokens_from_file() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(
            br#"{"tokens": [
                {"token": "t1", "subject": "etudiant1", "scopes": ["openid"]},
                {"token": "t2", "subject": "etudiant2", "revoked": true}
            ]}"#,
        )?;

        let verifier = StaticTokenVerifier::from_file(file.path())?;
        assert_eq!(verifier.len(), 2);

        let grant = verifier.verify("t1").await?;
        assert_eq!(grant.subject, "etudiant1");
        assert_eq!(grant.scopes, vec!["openid".to_string()]);
        assert_eq!(verifier.verify("t2").await, Err(TokenError::Revoked));
        Ok(())
    }

    #[test]
    fn rejects_bad_token_file() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(br#"{"tokens": [{"token": "t1"}]}"#)?;

        assert!(matches!(
            StaticTokenVerifier::from_file(file.path()),
            Err(SetupError::Json { .. })
        ));
        Ok(())
    }
}
