//! Authentication handlers.

use axum::{
    extract::{Extension, State},
    middleware,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{admin_middleware, auth_middleware};
use crate::api::AppState;
use crate::services::{AuthSession, SessionInfo, SessionTokens};
use crate::types::{ApiResponse, Created};
use common::AppResult;
use domain::{Principal, UserResponse};

pub const MSG_SIGNUP_COMPLETED: &str = "Registration completed successfully";
pub const MSG_LOGIN_SUCCESSFUL: &str = "Login successful";
pub const MSG_LOGOUT_SUCCESSFUL: &str = "Logout successful. All tokens have been revoked.";

/// Sign-up request: provider account plus profile
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(email(message = "Invalid email"))]
    #[schema(example = "mario.rossi@example.com")]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    #[schema(example = "secret123", min_length = 6)]
    pub password: String,
    #[serde(default)]
    #[validate(length(
        min = 2,
        max = 50,
        message = "First name must be between 2 and 50 characters"
    ))]
    #[schema(example = "Mario")]
    pub nome: String,
    #[serde(default)]
    #[validate(length(
        min = 2,
        max = 50,
        message = "Last name must be between 2 and 50 characters"
    ))]
    #[schema(example = "Rossi")]
    pub cognome: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Invalid email"))]
    #[schema(example = "mario.rossi@example.com")]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "refreshToken is required"))]
    pub refresh_token: String,
}

/// Profile completion for an account created client-side
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(
        min = 2,
        max = 50,
        message = "First name must be between 2 and 50 characters"
    ))]
    pub nome: String,
    #[serde(default)]
    #[validate(length(
        min = 2,
        max = 50,
        message = "Last name must be between 2 and 50 characters"
    ))]
    pub cognome: String,
}

/// Role assignment (admin only)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetRoleRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "uid and role are required"))]
    pub uid: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "uid and role are required"))]
    #[schema(example = "admin")]
    pub role: String,
}

/// `{user}` payload
#[derive(Debug, Serialize, ToSchema)]
pub struct UserData {
    pub user: UserResponse,
}

/// Create authentication routes.
///
/// Sign-up, login and refresh are public; the rest need a bearer token,
/// and set-role an admin one.
pub fn auth_routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/set-role", post(set_role))
        .route_layer(middleware::from_fn(admin_middleware));

    let protected = Router::new()
        .route("/register", post(register))
        .route("/verify", get(verify))
        .route("/logout", post(logout))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .merge(protected)
}

/// Create the provider account and the profile in one call
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "Authentication",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Registration completed", body = AuthSession),
        (status = 400, description = "Validation error or email already registered")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SignupRequest>,
) -> AppResult<Created<AuthSession>> {
    let session = state
        .auth_service
        .signup(payload.email, payload.password, payload.nome, payload.cognome)
        .await?;

    Ok(Created(ApiResponse::with_message(session, MSG_SIGNUP_COMPLETED)))
}

/// Authenticate and get the profile with fresh tokens
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthSession),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account disabled"),
        (status = 404, description = "Profile not found")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<ApiResponse<AuthSession>> {
    let session = state
        .auth_service
        .login(payload.email, payload.password)
        .await?;

    Ok(ApiResponse::with_message(session, MSG_LOGIN_SUCCESSFUL))
}

/// Exchange a refresh token for new tokens
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Authentication",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New tokens", body = SessionTokens),
        (status = 400, description = "refreshToken missing"),
        (status = 401, description = "Refresh token invalid or expired")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RefreshRequest>,
) -> AppResult<ApiResponse<SessionTokens>> {
    let tokens = state.auth_service.refresh(&payload.refresh_token).await?;
    Ok(ApiResponse::success(tokens))
}

/// Create the profile of the authenticated account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Profile created", body = UserData),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Profile already exists")
    )
)]
pub async fn register(
    Extension(principal): Extension<Principal>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<Created<UserData>> {
    let user = state
        .auth_service
        .register(&principal, payload.nome, payload.cognome)
        .await?;

    Ok(Created(ApiResponse::with_message(
        UserData { user: user.into() },
        MSG_SIGNUP_COMPLETED,
    )))
}

/// Describe the current session
#[utoipa::path(
    get,
    path = "/api/auth/verify",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Session details", body = SessionInfo),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn verify(
    Extension(principal): Extension<Principal>,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<SessionInfo>> {
    let info = state.auth_service.verify(&principal).await?;
    Ok(ApiResponse::success(info))
}

/// Revoke every refresh token of the caller
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Tokens revoked"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn logout(
    Extension(principal): Extension<Principal>,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<()>> {
    state.auth_service.logout(&principal).await?;
    Ok(ApiResponse::message(MSG_LOGOUT_SUCCESSFUL))
}

/// Set a user's role (admin only)
#[utoipa::path(
    post,
    path = "/api/auth/set-role",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Role updated"),
        (status = 400, description = "Missing fields or invalid role"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn set_role(
    Extension(principal): Extension<Principal>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SetRoleRequest>,
) -> AppResult<ApiResponse<()>> {
    let role = state
        .auth_service
        .set_role(&principal, &payload.uid, &payload.role)
        .await?;

    Ok(ApiResponse::message(format!(
        "Role updated to {} for user {}",
        role, payload.uid
    )))
}
