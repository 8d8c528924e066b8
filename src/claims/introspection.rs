//! RFC 7662 token introspection against the broker's authorization server.

use crate::{
    claims::{AccessGrant, SetupError, TokenError, TokenVerifier},
    APP_USER_AGENT,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, instrument};
use url::Url;

#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    active: bool,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Verifies bearer tokens by asking the introspection endpoint about them.
///
/// The HTTP client is built once and reused across requests.
#[derive(Clone, Debug)]
pub struct IntrospectionVerifier {
    client: Client,
    endpoint: Url,
    client_id: String,
    client_secret: SecretString,
}

impl IntrospectionVerifier {
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an http(s) URL or the HTTP
    /// client cannot be built.
    pub fn new(
        endpoint: &str,
        client_id: String,
        client_secret: SecretString,
    ) -> Result<Self, SetupError> {
        let endpoint = Url::parse(endpoint).map_err(|e| SetupError::Endpoint(e.to_string()))?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(SetupError::Endpoint(format!(
                "unsupported scheme {}",
                endpoint.scheme()
            )));
        }

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            client_id,
            client_secret,
        })
    }

    fn grant_from(response: IntrospectionResponse, now: i64) -> Result<AccessGrant, TokenError> {
        if !response.active {
            return Err(TokenError::Invalid("token is not active".to_string()));
        }
        if response.exp.is_some_and(|exp| exp <= now) {
            return Err(TokenError::Expired);
        }

        let subject = response
            .sub
            .filter(|sub| !sub.is_empty())
            .ok_or_else(|| TokenError::Invalid("token has no subject".to_string()))?;

        Ok(AccessGrant {
            subject,
            scopes: response
                .scope
                .as_deref()
                .unwrap_or_default()
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            client_id: response.client_id,
            expires_at: response.exp,
        })
    }
}

#[async_trait]
impl TokenVerifier for IntrospectionVerifier {
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    async fn verify(&self, token: &str) -> Result<AccessGrant, TokenError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .form(&[("token", token), ("token_type_hint", "access_token")])
            .send()
            .await
            .map_err(|e| {
                error!("Error calling introspection endpoint: {e}");
                TokenError::Unavailable("introspection request failed".to_string())
            })?;

        if response.status() != StatusCode::OK {
            error!("Token introspection failed: {}", response.status());
            return Err(TokenError::Unavailable(format!(
                "introspection endpoint returned {}",
                response.status().as_u16()
            )));
        }

        let body: IntrospectionResponse = response.json().await.map_err(|e| {
            error!("Error decoding introspection response: {e}");
            TokenError::Unavailable("invalid introspection response".to_string())
        })?;

        debug!(active = body.active, "introspection response");

        Self::grant_from(body, Utc::now().timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{body_string_contains, header_exists, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn verifier(server: &MockServer) -> Result<IntrospectionVerifier, SetupError> {
        IntrospectionVerifier::new(
            &format!("{}/introspect", server.uri()),
            "oidc2fer".to_string(),
            SecretString::from("s3cret".to_string()),
        )
    }

    #[test]
    fn rejects_non_http_endpoints() {
        for endpoint in ["not a url", "ftp://auth.example.fr/introspect"] {
            assert!(matches!(
                IntrospectionVerifier::new(endpoint, "id".to_string(), SecretString::from("x".to_string())),
                Err(SetupError::Endpoint(_))
            ));
        }
    }

    #[tokio::test]
    async fn active_token_yields_grant() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/introspect"))
            .and(header_exists("authorization"))
            .and(body_string_contains("token=good-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "active": true,
                "sub": "etudiant1",
                "scope": "openid profile email",
                "client_id": "client-123",
                "exp": Utc::now().timestamp() + 300
            })))
            .expect(1)
            .mount(&server)
            .await;

        let grant = verifier(&server)?.verify("good-token").await?;
        assert_eq!(grant.subject, "etudiant1");
        assert_eq!(grant.scopes, vec!["openid", "profile", "email"]);
        assert_eq!(grant.client_id.as_deref(), Some("client-123"));
        Ok(())
    }

    #[tokio::test]
    async fn inactive_token_is_invalid() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"active": false})))
            .mount(&server)
            .await;

        let result = verifier(&server)?.verify("revoked-token").await;
        assert_eq!(
            result,
            Err(TokenError::Invalid("token is not active".to_string()))
        );
        Ok(())
    }

    #[tokio::test]
    async fn server_errors_are_unavailable() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = verifier(&server)?.verify("any").await;
        assert_eq!(
            result,
            Err(TokenError::Unavailable(
                "introspection endpoint returned 503".to_string()
            ))
        );
        Ok(())
    }

    #[test]
    fn grant_from_checks_expiry_and_subject() {
        let expired = IntrospectionResponse {
            active: true,
            sub: Some("etudiant1".to_string()),
            scope: None,
            client_id: None,
            exp: Some(100),
        };
        assert_eq!(
            IntrospectionVerifier::grant_from(expired, 100),
            Err(TokenError::Expired)
        );

        let anonymous = IntrospectionResponse {
            active: true,
            sub: None,
            scope: Some("openid".to_string()),
            client_id: None,
            exp: None,
        };
        assert!(matches!(
            IntrospectionVerifier::grant_from(anonymous, 100),
            Err(TokenError::Invalid(_))
        ));
    }
}
