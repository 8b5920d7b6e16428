//! HTTP server assembly
//!
//! Builds the axum router: the authenticated command endpoint, the health
//! endpoint, request-id tracing and the tower-http trace layer.

use crate::api::handlers;
use crate::auth::{require_auth, SharedAuthenticator};
use crate::state::SharedState;
use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Request ID middleware - adds unique ID to each request for tracing
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}

/// Build the application router
pub fn build_router(state: SharedState, authenticator: SharedAuthenticator) -> Router {
    // Only the command endpoint requires credentials
    let commands = Router::new()
        .route("/", post(handlers::handle_command))
        .route_layer(middleware::from_fn_with_state(authenticator, require_auth));

    Router::new()
        .merge(commands)
        .route("/api/health", get(handlers::health_check))
        // Middleware (order matters - request_id should be first)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .with_state(state)
}
