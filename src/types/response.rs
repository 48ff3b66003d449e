use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

/// Envelope status of every successful response
pub const STATUS_SUCCESS: &str = "success";

/// Standard success envelope: `{status, message?, results?, params?, data?}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize, P: Serialize = ()> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Item count on list responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,
    /// Echo of the parsed query on search responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<P>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: STATUS_SUCCESS,
            message: None,
            results: None,
            params: None,
            data: Some(data),
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(data)
        }
    }

    /// List envelope carrying the item count
    pub fn list(data: T, results: usize) -> Self {
        Self {
            results: Some(results),
            ..Self::success(data)
        }
    }
}

impl<T: Serialize, P: Serialize> ApiResponse<T, P> {
    /// Attach the query parameters a search ran with
    pub fn with_params<Q: Serialize>(self, params: Q) -> ApiResponse<T, Q> {
        ApiResponse {
            status: self.status,
            message: self.message,
            results: self.results,
            params: Some(params),
            data: self.data,
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_SUCCESS,
            message: Some(message.into()),
            results: None,
            params: None,
            data: None,
        }
    }
}

impl<T: Serialize, P: Serialize> IntoResponse for ApiResponse<T, P> {
    fn into_response(self) -> axum::response::Response {
        Json(self).into_response()
    }
}

/// Created response helper (201 with the success envelope)
pub struct Created<T: Serialize>(pub ApiResponse<T>);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_skips_empty_fields() {
        let json = serde_json::to_value(ApiResponse::success(42)).unwrap();
        assert_eq!(json, serde_json::json!({"status": "success", "data": 42}));
    }

    #[test]
    fn test_list_with_params() {
        let response = ApiResponse::list(vec![1, 2], 2).with_params(serde_json::json!({"radius": 5}));
        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["results"], 2);
        assert_eq!(json["params"]["radius"], 5);
    }

    #[test]
    fn test_message_only() {
        let json = serde_json::to_value(ApiResponse::message("Place deleted")).unwrap();
        assert_eq!(json["message"], "Place deleted");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_created_status() {
        let response = Created(ApiResponse::success("ok")).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
