//! Rate limiting middleware using Redis counters.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::net::SocketAddr;

use crate::api::AppState;
use crate::config::{MSG_TOO_MANY_AUTH_ATTEMPTS, MSG_TOO_MANY_REQUESTS};
use common::RateLimit;

const HEADER_LIMIT: &str = "X-RateLimit-Limit";
const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
const HEADER_RETRY_AFTER: &str = "Retry-After";

/// Rate limit error response
#[derive(Debug)]
pub struct RateLimitError {
    pub limit: u64,
    pub retry_after: u64,
    pub message: &'static str,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_RETRY_AFTER, HeaderValue::from(self.retry_after));
        headers.insert(HEADER_LIMIT, HeaderValue::from(self.limit));
        headers.insert(HEADER_REMAINING, HeaderValue::from(0u64));

        (
            StatusCode::TOO_MANY_REQUESTS,
            headers,
            Json(json!({ "status": "fail", "message": self.message })),
        )
            .into_response()
    }
}

/// Extract client identifier for rate limiting.
/// Uses X-Forwarded-For header if behind proxy, otherwise uses connection IP.
pub fn client_identifier(request: &Request) -> String {
    // First hop of the proxy chain is the original client
    if let Some(ip) = request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|forwarded| forwarded.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return ip.to_string();
    }

    if let Some(real_ip) = request
        .headers()
        .get("X-Real-IP")
        .and_then(|h| h.to_str().ok())
    {
        return real_ip.trim().to_string();
    }

    if let Some(connect_info) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip().to_string();
    }

    "unknown".to_string()
}

/// General rate limiting for every `/api` route.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let limit = state.config.rate_limit.general;
    enforce(&state, "general", limit, MSG_TOO_MANY_REQUESTS, request, next).await
}

/// Stricter rate limiting for authentication endpoints, on top of the general one.
pub async fn rate_limit_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let limit = state.config.rate_limit.auth;
    enforce(&state, "auth", limit, MSG_TOO_MANY_AUTH_ATTEMPTS, request, next).await
}

async fn enforce(
    state: &AppState,
    scope: &str,
    limit: RateLimit,
    message: &'static str,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let Some(limiter) = state.rate_limiter.as_ref() else {
        return Ok(next.run(request).await);
    };

    let client_id = client_identifier(&request);
    let key = format!("{}:{}", scope, client_id);

    let decision = match limiter.check(&key, limit).await {
        Ok(decision) => decision,
        Err(e) => {
            // Fail closed: no counter, no request
            tracing::error!(error = %e, scope = scope, "Rate limit check failed - denying request");
            return Err(RateLimitError {
                limit: limit.max_requests,
                retry_after: limit.window_seconds,
                message,
            });
        }
    };

    if !decision.allowed {
        tracing::warn!(
            client = %client_id,
            scope = scope,
            count = decision.count,
            "Rate limit exceeded"
        );
        return Err(RateLimitError {
            limit: limit.max_requests,
            retry_after: decision.retry_after,
            message,
        });
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(HEADER_LIMIT, HeaderValue::from(limit.max_requests));
    headers.insert(HEADER_REMAINING, HeaderValue::from(decision.remaining(limit)));

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_rate_limit_error_response() {
        let error = RateLimitError {
            limit: 10,
            retry_after: 60,
            message: MSG_TOO_MANY_REQUESTS,
        };
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[HEADER_RETRY_AFTER], "60");
        assert_eq!(response.headers()[HEADER_REMAINING], "0");
    }

    #[test]
    fn test_client_identifier_prefers_forwarded_for() {
        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .header("X-Real-IP", "198.51.100.2")
            .body(Body::empty())
            .unwrap();

        assert_eq!(client_identifier(&request), "203.0.113.7");
    }

    #[test]
    fn test_client_identifier_falls_back_to_real_ip() {
        let request = Request::builder()
            .header("X-Real-IP", "198.51.100.2")
            .body(Body::empty())
            .unwrap();

        assert_eq!(client_identifier(&request), "198.51.100.2");
    }

    #[test]
    fn test_client_identifier_unknown() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_identifier(&request), "unknown");
    }
}
