use crate::{
    broker::handlers::{health, pipeline as pipeline_hook, userinfo},
    claims::ClaimsService,
    pipeline::{AttributeValue, AuthenticationRecord, Pipeline},
};
use anyhow::Result;
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;

/// Components built at startup and shared by every request.
#[derive(Clone, Debug)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub claims: ClaimsService,
}

impl AppState {
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline>, claims: ClaimsService) -> Self {
        Self { pipeline, claims }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        userinfo::userinfo_get,
        userinfo::userinfo_post,
        pipeline_hook::run,
    ),
    components(schemas(
        health::Health,
        userinfo::ErrorBody,
        AuthenticationRecord,
        AttributeValue,
    )),
    tags(
        (name = "userinfo", description = "Signed claims for bearer token holders"),
        (name = "pipeline", description = "Attribute pipeline hook for the broker"),
        (name = "health", description = "Service status"),
    )
)]
pub struct ApiDoc;

/// Build the application router with the request-id, trace and state layers.
pub fn router(state: AppState) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");

    Router::new()
        .route(
            "/userinfo",
            get(userinfo::userinfo_get).post(userinfo::userinfo_post),
        )
        .route("/pipeline/:phase", post(pipeline_hook::run))
        .route("/health", get(health::health).options(health::health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    x_request_id.clone(),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(Arc::new(state))),
        )
}

/// Serve the router on `[::]:port` until ctrl-c.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn new(port: u16, state: AppState) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// Authorization headers are never recorded.
fn make_span(request: &Request<Body>) -> Span {
    let method = request.method();
    let path = request.uri().path();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", %method, path, request_id)
}
