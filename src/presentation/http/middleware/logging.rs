//! Per-request access log: method, path, status, and latency. Runs nested
//! inside `request_id_middleware`'s span, so every line here already carries
//! `request_id`. `GatewayError`'s own `IntoResponse` logs failures at their
//! own severity tier; this middleware only needs to cover the happy path
//! those don't touch.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "{method} {path}"
    );
    response
}
