use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ApiError;

pub const CURRENT_VERSION: &str = "v1";
pub const SUPPORTED_VERSIONS: &[&str] = &["v1"];

pub const API_VERSION: &str = "x-api-version";
pub const API_CURRENT_VERSION: &str = "x-api-current-version";

static VENDOR_ACCEPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"application/vnd\.humboldt\.(v\d+)").expect("vendor accept pattern is valid")
});

/// Resolve the API version a request asks for: vendor `Accept` type first,
/// then the `X-API-Version` header, then the `/api/<version>/` path segment.
pub fn requested_version(headers: &HeaderMap, path: &str) -> String {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| VENDOR_ACCEPT.captures(v))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    if let Some(version) = accept {
        return version;
    }

    if let Some(version) = headers
        .get(API_VERSION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return version.to_string();
    }

    path.trim_matches('/')
        .split('/')
        .nth(1)
        .filter(|segment| segment.starts_with('v'))
        .unwrap_or(CURRENT_VERSION)
        .to_string()
}

/// Stamp `/api/` responses with the served and current API versions and
/// reject versions this server does not speak.
pub async fn api_version(request: Request, next: Next) -> Response {
    if !request.uri().path().starts_with("/api/") {
        return next.run(request).await;
    }

    let version = requested_version(request.headers(), request.uri().path());
    let mut response = if SUPPORTED_VERSIONS.contains(&version.as_str()) {
        next.run(request).await
    } else {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "Unsupported API Version",
            "UNSUPPORTED_VERSION",
            format!(
                "API version {} is not supported; supported versions: {}",
                version,
                SUPPORTED_VERSIONS.join(", ")
            ),
        )
        .into_response()
    };

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&version) {
        headers.insert(HeaderName::from_static(API_VERSION), value);
    }
    headers.insert(
        HeaderName::from_static(API_CURRENT_VERSION),
        HeaderValue::from_static(CURRENT_VERSION),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use axum_test::TestServer;

    fn server() -> TestServer {
        let app = Router::new()
            .route("/api/v1/things", get(|| async { "ok" }))
            .route("/api/v2/things", get(|| async { "ok" }))
            .route("/health", get(|| async { "ok" }))
            .layer(middleware::from_fn(api_version));
        TestServer::new(app).unwrap()
    }

    #[test]
    fn test_version_resolution_order() {
        let mut headers = HeaderMap::new();
        assert_eq!(requested_version(&headers, "/api/v1/projects"), "v1");
        assert_eq!(requested_version(&headers, "/api/projects"), "v1");
        assert_eq!(requested_version(&headers, "/api/v3/projects"), "v3");

        headers.insert(
            HeaderName::from_static(API_VERSION),
            HeaderValue::from_static("v2"),
        );
        assert_eq!(requested_version(&headers, "/api/v1/projects"), "v2");

        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.humboldt.v7+json"),
        );
        assert_eq!(requested_version(&headers, "/api/v1/projects"), "v7");
    }

    #[tokio::test]
    async fn test_api_responses_carry_version_headers() {
        let response = server().get("/api/v1/things").await;
        response.assert_status_ok();
        assert_eq!(response.headers()[API_VERSION], "v1");
        assert_eq!(response.headers()[API_CURRENT_VERSION], "v1");
    }

    #[tokio::test]
    async fn test_unsupported_version_is_rejected() {
        let response = server().get("/api/v2/things").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[API_VERSION], "v2");
        assert_eq!(response.headers()[API_CURRENT_VERSION], "v1");

        let response = server()
            .get("/api/v1/things")
            .add_header(
                HeaderName::from_static(API_VERSION),
                HeaderValue::from_static("v9"),
            )
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_api_paths_are_untouched() {
        let response = server().get("/health").await;
        response.assert_status_ok();
        assert!(response.headers().get(API_VERSION).is_none());
    }
}
