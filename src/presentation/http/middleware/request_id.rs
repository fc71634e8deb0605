//! Assigns each inbound request a v7 UUID: threaded through every log line
//! the request produces (including the admission pipeline's own
//! `tracing::instrument` fields) via a parent span, stashed in the request
//! extensions for handlers that want it, and echoed back in the
//! `X-Request-Id` response header so a caller can correlate a failed mint
//! with gateway logs.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Instrument;
use uuid::Uuid;

/// Request-scoped id, reachable from handlers via `Extension<RequestId>`.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::now_v7().to_string();
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let mut response = next.run(req).instrument(span).await;
    if let Ok(val) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", val);
    }
    response
}
