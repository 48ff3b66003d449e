//! Validated JSON extractor - Combines deserialization with validation.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use super::{first_validation_message, json_rejection_message};
use common::AppError;

/// Validated JSON extractor that automatically validates requests.
///
/// Malformed bodies and failed rules are both 400s; only the first failing
/// field's message is reported. A missing required field reads as
/// e.g. "location is required" rather than the raw serde text.
///
/// # Example
///
/// ```rust,ignore
/// use serde::Deserialize;
/// use validator::Validate;
/// use greenzone::api::extractors::ValidatedJson;
///
/// #[derive(Deserialize, Validate)]
/// struct LoginRequest {
///     #[validate(email(message = "Invalid email"))]
///     email: String,
/// }
///
/// async fn login(ValidatedJson(payload): ValidatedJson<LoginRequest>) {
///     // payload is already validated
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(json_rejection_message(&e)))?;

        value
            .validate()
            .map_err(|e| AppError::validation(first_validation_message(&e)))?;

        Ok(ValidatedJson(value))
    }
}
