//! HTTP middleware for the resource server.

use axum::{body::Body, extract::Request, http::header, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, span, Level};

/// Log each protected request with latency and status.
pub async fn logging(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let span = span!(Level::INFO, "request", %method, %uri);
    let _enter = span.enter();

    let start = Instant::now();
    let response = next.run(request).await;

    info!(
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "Request completed"
    );

    response
}

/// CORS configuration for the protected endpoints.
pub fn cors_layer() -> tower_http::cors::CorsLayer {
    tower_http::cors::CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}
