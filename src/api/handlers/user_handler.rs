//! User handlers.

use axum::{
    extract::{Extension, Path, State},
    middleware,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use super::auth_handler::UserData;
use crate::api::extractors::{ValidatedJson, ValidatedQuery};
use crate::api::middleware::auth_middleware;
use crate::api::AppState;
use crate::services::MSG_INVALID_ROLE;
use crate::types::{ApiResponse, Created};
use common::AppResult;
use domain::{Principal, UserPatch, UserResponse, UserRole};

pub const MSG_USER_CREATED: &str = "User created successfully";
pub const MSG_USER_UPDATED: &str = "User updated successfully";
pub const MSG_USER_SOFT_DELETED: &str = "User deleted (soft delete)";
pub const MSG_USER_HARD_DELETED: &str = "User permanently deleted (hard delete)";
pub const MSG_USER_RESTORED: &str = "User restored successfully";

/// Profile creation request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
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
    /// Anything other than `user` requires admin
    #[validate(custom(function = "validate_role"))]
    #[schema(example = "user")]
    pub ruolo: Option<String>,
}

/// User update request; at least one field
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(
        min = 2,
        max = 50,
        message = "First name must be between 2 and 50 characters"
    ))]
    pub nome: Option<String>,
    #[validate(length(
        min = 2,
        max = 50,
        message = "Last name must be between 2 and 50 characters"
    ))]
    pub cognome: Option<String>,
    /// Admin only
    #[validate(custom(function = "validate_role"))]
    pub ruolo: Option<String>,
}

impl From<UpdateUserRequest> for UserPatch {
    fn from(request: UpdateUserRequest) -> Self {
        Self {
            nome: request.nome,
            cognome: request.cognome,
            ruolo: request.ruolo.as_deref().map(UserRole::from),
        }
    }
}

/// Listing options
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Include soft-deleted profiles
    #[serde(default)]
    pub include_deleted: bool,
}

/// `{users}` payload
#[derive(Debug, Serialize, ToSchema)]
pub struct UsersData {
    pub users: Vec<UserResponse>,
}

fn validate_role(role: &str) -> Result<(), ValidationError> {
    if UserRole::parse(role).is_some() {
        return Ok(());
    }

    let mut error = ValidationError::new("role");
    error.message = Some(MSG_INVALID_ROLE.into());
    Err(error)
}

fn user_data(user: impl Into<UserResponse>) -> UserData {
    UserData { user: user.into() }
}

/// Create user routes; every route requires a bearer token
pub fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me", get(get_current_user))
        .route("/:uid", get(get_user).put(update_user).delete(delete_user))
        .route("/:uid/hard", delete(hard_delete_user))
        .route("/:uid/restore", post(restore_user))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Get current authenticated user
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user profile", body = UserData),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Profile not found")
    )
)]
pub async fn get_current_user(
    Extension(principal): Extension<Principal>,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UserData>> {
    let user = state.user_service.me(&principal).await?;
    Ok(ApiResponse::success(user_data(user)))
}

/// List all users (admin only)
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(ListUsersQuery),
    responses(
        (status = 200, description = "List of users", body = UsersData),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn list_users(
    Extension(principal): Extension<Principal>,
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<ListUsersQuery>,
) -> AppResult<ApiResponse<UsersData>> {
    let users = state
        .user_service
        .list(&principal, query.include_deleted)
        .await?;

    let count = users.len();
    let users = users.into_iter().map(UserResponse::from).collect();
    Ok(ApiResponse::list(UsersData { users }, count))
}

/// Create the caller's own profile
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserData),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only admins can assign a role other than user"),
        (status = 409, description = "User already exists")
    )
)]
pub async fn create_user(
    Extension(principal): Extension<Principal>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> AppResult<Created<UserData>> {
    let ruolo = payload.ruolo.as_deref().map(UserRole::from);
    let user = state
        .user_service
        .create(&principal, payload.nome, payload.cognome, ruolo)
        .await?;

    Ok(Created(ApiResponse::with_message(user_data(user), MSG_USER_CREATED)))
}

/// Get user by uid (own profile or admin)
#[utoipa::path(
    get,
    path = "/api/users/{uid}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("uid" = String, Path, description = "Identity provider user id")),
    responses(
        (status = 200, description = "User profile", body = UserData),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - own profile only unless admin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    Extension(principal): Extension<Principal>,
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<ApiResponse<UserData>> {
    let user = state.user_service.get(&principal, &uid).await?;
    Ok(ApiResponse::success(user_data(user)))
}

/// Update user (own profile, or admin; role changes admin only)
#[utoipa::path(
    put,
    path = "/api/users/{uid}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("uid" = String, Path, description = "Identity provider user id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserData),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    Extension(principal): Extension<Principal>,
    State(state): State<AppState>,
    Path(uid): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<ApiResponse<UserData>> {
    let user = state
        .user_service
        .update(&principal, &uid, payload.into())
        .await?;

    Ok(ApiResponse::with_message(user_data(user), MSG_USER_UPDATED))
}

/// Soft-delete user (own profile or admin)
#[utoipa::path(
    delete,
    path = "/api/users/{uid}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("uid" = String, Path, description = "Identity provider user id")),
    responses(
        (status = 200, description = "User soft-deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User already deleted")
    )
)]
pub async fn delete_user(
    Extension(principal): Extension<Principal>,
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.user_service.soft_delete(&principal, &uid).await?;
    Ok(ApiResponse::message(MSG_USER_SOFT_DELETED))
}

/// Permanently delete user and provider account (admin only)
#[utoipa::path(
    delete,
    path = "/api/users/{uid}/hard",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("uid" = String, Path, description = "Identity provider user id")),
    responses(
        (status = 200, description = "User permanently deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn hard_delete_user(
    Extension(principal): Extension<Principal>,
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.user_service.hard_delete(&principal, &uid).await?;
    Ok(ApiResponse::message(MSG_USER_HARD_DELETED))
}

/// Restore a soft-deleted user (admin only)
#[utoipa::path(
    post,
    path = "/api/users/{uid}/restore",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("uid" = String, Path, description = "Identity provider user id")),
    responses(
        (status = 200, description = "User restored", body = UserData),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin only"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User is not deleted")
    )
)]
pub async fn restore_user(
    Extension(principal): Extension<Principal>,
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<ApiResponse<UserData>> {
    let user = state.user_service.restore(&principal, &uid).await?;
    Ok(ApiResponse::with_message(user_data(user), MSG_USER_RESTORED))
}
