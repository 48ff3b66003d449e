//! Application settings loaded from environment variables.

use std::env;
use std::str::FromStr;

use common::{
    CacheConfig, DatabaseConfig, Environment, IdentityConfig, RateLimit, RateLimitConfig,
    ServiceConfig,
};

use super::constants::{
    DEFAULT_DATABASE_MAX_CONNECTIONS, DEFAULT_DATABASE_MIN_CONNECTIONS, DEFAULT_DATABASE_URL,
    DEFAULT_IDENTITY_TIMEOUT_SECONDS, DEFAULT_REDIS_URL, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
    MAX_BODY_BYTES, RATE_LIMIT_AUTH_REQUESTS, RATE_LIMIT_AUTH_WINDOW_SECONDS, RATE_LIMIT_REQUESTS,
    RATE_LIMIT_WINDOW_SECONDS,
};

/// Application configuration
#[derive(Clone, Default)]
pub struct Config {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub identity: IdentityConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("service", &self.service)
            .field("database_url", &"[REDACTED]")
            .field("redis_url", &"[REDACTED]")
            .field("rate_limit", &self.rate_limit)
            .field("identity_api_key", &"[REDACTED]")
            .field("identity_project_id", &self.identity.project_id)
            .field("identity_credentials_path", &self.identity.credentials_path)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing identity settings are reported by [`Config::validate`], not here,
    /// so that commands which never talk to the provider still run.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = IdentityConfig::default();

        Self {
            service: ServiceConfig {
                host: env_or("SERVER_HOST", DEFAULT_SERVER_HOST),
                port: env_parse("SERVER_PORT", DEFAULT_SERVER_PORT),
                environment: Environment::parse(&env_or("APP_ENV", "development")),
                cors_origin: env_or("CORS_ORIGIN", "*"),
                body_limit_bytes: MAX_BODY_BYTES,
            },
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL),
                max_connections: env_parse(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                min_connections: env_parse(
                    "DATABASE_MIN_CONNECTIONS",
                    DEFAULT_DATABASE_MIN_CONNECTIONS,
                ),
            },
            cache: CacheConfig {
                url: env_or("REDIS_URL", DEFAULT_REDIS_URL),
            },
            rate_limit: RateLimitConfig {
                enabled: env_parse("RATE_LIMIT_ENABLED", true),
                general: RateLimit {
                    max_requests: env_parse("RATE_LIMIT_REQUESTS", RATE_LIMIT_REQUESTS),
                    window_seconds: env_parse(
                        "RATE_LIMIT_WINDOW_SECONDS",
                        RATE_LIMIT_WINDOW_SECONDS,
                    ),
                },
                auth: RateLimit {
                    max_requests: env_parse("RATE_LIMIT_AUTH_REQUESTS", RATE_LIMIT_AUTH_REQUESTS),
                    window_seconds: env_parse(
                        "RATE_LIMIT_AUTH_WINDOW_SECONDS",
                        RATE_LIMIT_AUTH_WINDOW_SECONDS,
                    ),
                },
            },
            identity: IdentityConfig {
                api_key: env_or("FIREBASE_API_KEY", ""),
                project_id: env_or("FIREBASE_PROJECT_ID", ""),
                credentials_path: env_or("GOOGLE_APPLICATION_CREDENTIALS", ""),
                timeout_seconds: env_parse(
                    "IDENTITY_TIMEOUT_SECONDS",
                    DEFAULT_IDENTITY_TIMEOUT_SECONDS,
                ),
                check_revoked: env_parse("IDENTITY_CHECK_REVOKED", true),
                ..defaults
            },
        }
    }

    /// Check the settings the HTTP server cannot start without.
    pub fn validate(&self) -> Result<(), String> {
        let missing: Vec<&str> = [
            ("FIREBASE_API_KEY", self.identity.api_key.as_str()),
            ("FIREBASE_PROJECT_ID", self.identity.project_id.as_str()),
            (
                "GOOGLE_APPLICATION_CREDENTIALS",
                self.identity.credentials_path.as_str(),
            ),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("Missing required settings: {}", missing.join(", ")))
        }
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.service.host, self.service.port)
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
