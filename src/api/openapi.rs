//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{auth_handler, health_handler, place_handler, user_handler};
use crate::services::{AuthSession, ProfileSummary, SessionInfo, SessionTokens};
use domain::{Category, Contact, Location, PlaceResponse, TimeRange, UserResponse, UserRole};

/// OpenAPI documentation for the GreenZone API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "GreenZone API",
        version = "1.0.0",
        description = "Backend of the GreenZone mobile app: accounts, profiles and bio places",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        // Health
        health_handler::root,
        health_handler::health,
        // Authentication endpoints
        auth_handler::signup,
        auth_handler::login,
        auth_handler::refresh,
        auth_handler::register,
        auth_handler::verify,
        auth_handler::logout,
        auth_handler::set_role,
        // User endpoints
        user_handler::get_current_user,
        user_handler::list_users,
        user_handler::create_user,
        user_handler::get_user,
        user_handler::update_user,
        user_handler::delete_user,
        user_handler::hard_delete_user,
        user_handler::restore_user,
        // Place endpoints
        place_handler::list_places,
        place_handler::nearby_places,
        place_handler::places_by_category,
        place_handler::places_by_user,
        place_handler::get_place,
        place_handler::create_place,
        place_handler::update_place,
        place_handler::delete_place,
        place_handler::hard_delete_place,
        place_handler::restore_place,
    ),
    components(
        schemas(
            // Domain types
            UserRole,
            UserResponse,
            Category,
            Location,
            Contact,
            TimeRange,
            PlaceResponse,
            // Auth types
            AuthSession,
            ProfileSummary,
            SessionTokens,
            SessionInfo,
            auth_handler::SignupRequest,
            auth_handler::LoginRequest,
            auth_handler::RefreshRequest,
            auth_handler::RegisterRequest,
            auth_handler::SetRoleRequest,
            auth_handler::UserData,
            // User handler types
            user_handler::CreateUserRequest,
            user_handler::UpdateUserRequest,
            user_handler::UsersData,
            // Place handler types
            place_handler::LocationRequest,
            place_handler::ContactRequest,
            place_handler::CreatePlaceRequest,
            place_handler::UpdatePlaceRequest,
            place_handler::PlaceData,
            place_handler::PlacesData,
            place_handler::NearbyPlaceResponse,
            place_handler::NearbyPlacesData,
            place_handler::NearbySearchParams,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service status"),
        (name = "Authentication", description = "Sign-up, login and sessions"),
        (name = "Users", description = "Profile management"),
        (name = "Places", description = "Bio places catalogue")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for bearer ID tokens
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("ID token obtained from /api/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_place_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/places/nearby"));
        assert!(doc.paths.paths.contains_key("/api/auth/set-role"));
    }
}
