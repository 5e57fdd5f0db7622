use axum::{
    body::to_bytes,
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use crate::errors::{ApiError, ErrorEnvelope};

const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

/// Give every error response the `{error, message, code, path, timestamp}`
/// body.
///
/// Handler errors carry their envelope in the response extensions and only
/// need the request path filled in. Plain-text errors produced by the
/// framework (unknown routes, rejected methods, body limits) are rewrapped.
/// Other JSON error bodies, such as the health report, pass through.
pub async fn error_envelope(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    warn!("{} {} -> {}", method, path, status.as_u16());

    let (mut parts, body) = response.into_parts();
    let mut envelope = match parts.extensions.remove::<ErrorEnvelope>() {
        Some(envelope) => envelope,
        None if is_json(&parts.headers) => return Response::from_parts(parts, body),
        None => {
            let text = match to_bytes(body, MAX_ERROR_BODY_BYTES).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
                Err(_) => String::new(),
            };
            let message = if text.is_empty() {
                status.canonical_reason().unwrap_or("Request failed").to_string()
            } else {
                text
            };
            ApiError::from_status(status, message).envelope()
        }
    };
    envelope.path = path;

    rebuild(status, &parts.headers, envelope)
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}

fn rebuild(status: StatusCode, original: &HeaderMap, envelope: ErrorEnvelope) -> Response {
    let mut response = (status, Json(envelope)).into_response();
    for (name, value) in original {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            response.headers_mut().insert(name.clone(), value.clone());
        }
    }
    response
}
