//! Application route configuration.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, Uri},
    middleware,
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::health_handler::{health, root};
use super::handlers::{auth_routes, place_routes, user_routes};
use super::middleware::{error_detail_middleware, rate_limit_auth_middleware, rate_limit_middleware};
use super::openapi::ApiDoc;
use super::AppState;
use common::AppError;

/// Create the application router with all routes configured
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // Everything under /api shares the general limit; auth adds its own
    let api = Router::new()
        .nest(
            "/auth",
            auth_routes(state.clone()).route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit_auth_middleware,
            )),
        )
        .nest("/users", user_routes(state.clone()))
        .nest("/places", place_routes(state.clone()))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let mut router = Router::new()
        // Health check endpoints (no rate limiting)
        .route("/", get(root))
        .route("/health", get(health))
        // OpenAPI Swagger UI documentation
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(config.service.body_limit_bytes))
        .layer(cors_layer(&config.service.cors_origin));

    if config.service.environment.exposes_error_details() {
        router = router.layer(middleware::from_fn(error_detail_middleware));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Unknown routes
async fn not_found(uri: Uri) -> AppError {
    AppError::not_found(format!("Resource not found: {}", uri.path()))
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = match origin.trim() {
        "*" | "" => AllowOrigin::from(Any),
        origin => match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Invalid CORS_ORIGIN, allowing any origin");
                AllowOrigin::from(Any)
            }
        },
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
