//! Bearer-protected userinfo returning a signed JWT.

use crate::{
    broker::AppState,
    claims::{ReleaseError, TokenError},
};
use axum::{
    extract::{Extension, Form, Query},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Json, Response},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};
use utoipa::ToSchema;

pub const JWT_CONTENT_TYPE: &str = "application/jwt";

// RFC 6750 section 2.1
const B64TOKEN: &str = r"^[A-Za-z0-9\-._~+/]+=*$";

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

/// RFC 6750 `access_token` parameter, from a form body (POST) or the query
/// string (GET).
#[derive(Deserialize, Debug)]
pub struct AccessTokenForm {
    access_token: Option<String>,
}

fn valid_b64token(token: &str) -> bool {
    Regex::new(B64TOKEN).is_ok_and(|re| re.is_match(token))
}

/// Extract the bearer token from the `Authorization` header.
///
/// Returns `Ok(None)` when the header is absent.
///
/// # Errors
///
/// `TokenError::Malformed` for any other scheme or a token outside the
/// `b64token` alphabet.
pub fn bearer_from_headers(headers: &HeaderMap) -> Result<Option<String>, TokenError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| TokenError::Malformed)?;
    let (scheme, token) = value.split_once(' ').ok_or(TokenError::Malformed)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(TokenError::Malformed);
    }

    let token = token.trim();
    if !valid_b64token(token) {
        return Err(TokenError::Malformed);
    }

    Ok(Some(token.to_string()))
}

fn token_from_request(
    headers: &HeaderMap,
    params: Option<AccessTokenForm>,
) -> Result<String, TokenError> {
    let from_header = bearer_from_headers(headers)?;
    let from_params = params
        .and_then(|form| form.access_token)
        .filter(|token| !token.is_empty());

    match (from_header, from_params) {
        (Some(token), None) => Ok(token),
        (None, Some(token)) if valid_b64token(&token) => Ok(token),
        (None, Some(_)) | (Some(_), Some(_)) => Err(TokenError::Malformed),
        (None, None) => Err(TokenError::Missing),
    }
}

/// 401 `invalid_token` challenge.
#[must_use]
pub fn invalid_token(err: &TokenError) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(WWW_AUTHENTICATE, "Bearer")],
        Json(ErrorBody {
            error: "invalid_token".to_string(),
            error_description: Some(err.to_string()),
        }),
    )
        .into_response()
}

async fn respond(state: &AppState, token: Result<String, TokenError>) -> Response {
    let token = match token {
        Ok(token) => token,
        Err(e) => {
            debug!("No usable bearer token: {e}");
            return invalid_token(&e);
        }
    };

    match state.claims.release(&token).await {
        Ok(jwt) => (StatusCode::OK, [(CONTENT_TYPE, JWT_CONTENT_TYPE)], jwt).into_response(),
        Err(ReleaseError::Token(e)) => {
            if matches!(e, TokenError::Unavailable(_)) {
                error!("Token verification failed: {e}");
            } else {
                warn!("Access token rejected: {e}");
            }
            invalid_token(&e)
        }
        Err(ReleaseError::Sign(e)) => {
            error!("Error signing userinfo response: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "server_error".to_string(),
                    error_description: None,
                }),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    get,
    path= "/userinfo",
    params(
        ("access_token" = Option<String>, Query, description = "Access token, when not sent in the Authorization header")
    ),
    responses (
        (status = 200, description = "Signed claims of the token's subject", body = String, content_type = "application/jwt"),
        (status = 401, description = "Missing, malformed or invalid bearer token", body = ErrorBody),
        (status = 500, description = "Error signing the response", body = ErrorBody)
    ),
    tag = "userinfo",
)]
#[instrument(skip_all)]
pub async fn userinfo_get(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    query: Option<Query<AccessTokenForm>>,
) -> Response {
    let query = query.map(|Query(query)| query);
    respond(&state, token_from_request(&headers, query)).await
}

#[utoipa::path(
    post,
    path= "/userinfo",
    request_body(content = String, description = "Optional access_token form field", content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "Signed claims of the token's subject", body = String, content_type = "application/jwt"),
        (status = 401, description = "Missing, malformed or invalid bearer token", body = ErrorBody),
        (status = 500, description = "Error signing the response", body = ErrorBody)
    ),
    tag = "userinfo",
)]
#[instrument(skip_all)]
pub async fn userinfo_post(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    form: Option<Form<AccessTokenForm>>,
) -> Response {
    let form = form.map(|Form(form)| form);
    respond(&state, token_from_request(&headers, form)).await
}
