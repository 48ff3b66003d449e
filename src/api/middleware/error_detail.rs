//! Development-only exposure of internal error details.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::header::CONTENT_LENGTH,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use common::ErrorDetail;

/// Copy the hidden [`ErrorDetail`] of a 5xx response into its body as `detail`.
///
/// Only layered onto the router in development.
pub async fn error_detail_middleware(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Could not buffer error body: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let mut envelope: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };

    if let Some(fields) = envelope.as_object_mut() {
        fields.insert("detail".to_string(), serde_json::Value::String(detail));
    }

    parts.headers.remove(CONTENT_LENGTH);
    (parts, Json(envelope)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use common::AppError;
    use tower::ServiceExt;

    async fn failing() -> Result<(), AppError> {
        Err(AppError::internal("pool timed out"))
    }

    #[tokio::test]
    async fn test_detail_added_to_internal_errors() {
        let app = Router::new()
            .route("/", get(failing))
            .layer(middleware::from_fn(error_detail_middleware));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "An internal error occurred");
        assert_eq!(json["detail"], "pool timed out");
    }
}
