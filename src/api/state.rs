//! Application state - Dependency injection container.
//!
//! Provides centralized access to all application services and infrastructure.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::{Cache, Database, RateLimiter};
use crate::services::{AuthService, PlaceService, ServiceContainer, UserService};

/// Application state containing all services (DI container).
///
/// Backing stores are optional so the router can run against in-memory
/// fakes; health reporting only covers what is configured.
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth_service: Arc<dyn AuthService>,
    /// User service
    pub user_service: Arc<dyn UserService>,
    /// Place service
    pub place_service: Arc<dyn PlaceService>,
    /// Request counters; `None` disables rate limiting
    pub rate_limiter: Option<Arc<dyn RateLimiter>>,
    /// Database connection
    pub database: Option<Database>,
    /// Redis cache
    pub cache: Option<Cache>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Create application state from a service container.
    pub fn new(services: &dyn ServiceContainer, config: Config) -> Self {
        Self {
            auth_service: services.auth(),
            user_service: services.users(),
            place_service: services.places(),
            rate_limiter: None,
            database: None,
            cache: None,
            config: Arc::new(config),
        }
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    /// Attach Redis; it also backs the rate limiter when limiting is enabled.
    pub fn with_cache(mut self, cache: Cache) -> Self {
        if self.config.rate_limit.enabled {
            self.rate_limiter = Some(Arc::new(cache.clone()));
        }
        self.cache = Some(cache);
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }
}
