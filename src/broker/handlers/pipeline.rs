use crate::{
    broker::AppState,
    pipeline::{AuthenticationRecord, Context, Outcome, Phase},
};
use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::instrument;
use ulid::Ulid;

#[utoipa::path(
    post,
    path= "/pipeline/{phase}",
    params(
        ("phase" = String, Path, description = "Pipeline phase: request or response")
    ),
    request_body = AuthenticationRecord,
    responses (
        (status = 200, description = "Every stage forwarded the record", body = AuthenticationRecord),
        (status = 400, description = "Unknown phase or invalid record"),
    ),
    tag = "pipeline",
)]
/// Run one phase of the attribute pipeline over an authentication record.
///
/// A halting stage answers with its own status and body instead of the record.
#[instrument(skip_all, fields(phase = %phase))]
pub async fn run(
    state: Extension<Arc<AppState>>,
    Path(phase): Path<Phase>,
    headers: HeaderMap,
    Json(record): Json<AuthenticationRecord>,
) -> Response {
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .map_or_else(|| Ulid::new().to_string(), str::to_string);

    match state.pipeline.run(record, &Context::new(request_id, phase)) {
        Outcome::Forward(record) => (StatusCode::OK, Json(record)).into_response(),
        Outcome::Halted(halt) => halt.into_response(),
    }
}
