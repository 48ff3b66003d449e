//! Root banner and health check.

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::AppState;
use crate::config::{API_BANNER, API_VERSION};
use crate::types::STATUS_SUCCESS;

/// Root endpoint response
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: Endpoints,
}

/// Entry points of the API
#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub health: &'static str,
    pub auth: &'static str,
    pub users: &'static str,
    pub places: &'static str,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub services: ServiceHealth,
}

/// Backing service status; absent when not configured
#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<ServiceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<ServiceStatus>,
}

/// Service status
#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceStatus {
    fn healthy() -> Self {
        Self {
            status: "healthy",
            error: None,
        }
    }

    fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: "unhealthy",
            error: Some(error.into()),
        }
    }

    fn is_healthy(&self) -> bool {
        self.error.is_none()
    }
}

/// API banner
#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    responses((status = 200, description = "API banner"))
)]
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        status: STATUS_SUCCESS,
        message: API_BANNER,
        version: API_VERSION,
        endpoints: Endpoints {
            health: "/health",
            auth: "/api/auth",
            users: "/api/users",
            places: "/api/places",
        },
    })
}

/// Health check with database and Redis connectivity
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "All configured services reachable"),
        (status = 503, description = "A configured service is down")
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match &state.database {
        Some(db) => Some(match db.ping().await {
            Ok(()) => ServiceStatus::healthy(),
            Err(e) => {
                tracing::warn!("Database health check failed: {}", e);
                ServiceStatus::unhealthy(e.to_string())
            }
        }),
        None => None,
    };

    let cache = match &state.cache {
        Some(cache) if cache.ping().await => Some(ServiceStatus::healthy()),
        Some(_) => Some(ServiceStatus::unhealthy("PING failed")),
        None => None,
    };

    let all_healthy = [&database, &cache]
        .into_iter()
        .flatten()
        .all(ServiceStatus::is_healthy);

    let response = HealthResponse {
        status: if all_healthy { "ok" } else { "degraded" },
        timestamp: Utc::now(),
        services: ServiceHealth { database, cache },
    };

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
