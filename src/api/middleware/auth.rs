//! Bearer-token authentication middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::api::AppState;
use common::AppError;
use domain::{authorize, Policy, Principal};

pub const MSG_TOKEN_MISSING: &str = "Authentication token missing";

/// Authentication middleware.
///
/// Verifies the ID token from the Authorization header, resolves the
/// caller's current role and injects the [`domain::Principal`] into the
/// request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.ok_or_else(|| AppError::unauthorized(MSG_TOKEN_MISSING))?;

    let principal = state.auth_service.resolve_principal(bearer.token()).await?;
    tracing::debug!(uid = %principal.uid, role = %principal.role, "Request authenticated");

    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

/// Admin gate for routes already behind [`auth_middleware`].
///
/// Runs before the handler's body extraction, so non-admins are refused
/// whatever they send.
pub async fn admin_middleware(request: Request, next: Next) -> Result<Response, AppError> {
    authorize(request.extensions().get::<Principal>(), Policy::AdminOnly)?;
    Ok(next.run(request).await)
}
