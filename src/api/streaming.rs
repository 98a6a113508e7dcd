//! Server-Sent Events (SSE) responses for streaming chat completions.

use crate::services::chat_service::ChatStream;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;

pub const SSE_CONTENT_TYPE: &str = "text/event-stream";

/// Wrap a chat event stream into an HTTP response with SSE headers.
///
/// Chunks are forwarded unchanged; framing is the producer's job.
pub fn sse_response(stream: ChatStream) -> Response {
    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(SSE_CONTENT_TYPE));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}
