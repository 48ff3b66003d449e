//! Redis cache implementation.
//!
//! Redis only backs the fixed-window rate-limit counters; all durable
//! state lives in Postgres.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client, RedisError};

use crate::config::CACHE_PREFIX_RATE_LIMIT;
use common::{AppError, AppResult, CacheConfig, RateLimit};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Outcome of counting one request against a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Requests seen in the current window, this one included
    pub count: u64,
    pub allowed: bool,
    /// Seconds until the window resets
    pub retry_after: u64,
}

impl RateLimitDecision {
    /// Build a decision from a counter value.
    pub fn from_count(count: u64, limit: RateLimit, ttl: i64) -> Self {
        let retry_after = if ttl > 0 {
            ttl as u64
        } else {
            limit.window_seconds
        };

        Self {
            count,
            allowed: count <= limit.max_requests,
            retry_after,
        }
    }

    pub fn remaining(&self, limit: RateLimit) -> u64 {
        limit.max_requests.saturating_sub(self.count)
    }
}

/// Fixed-window request counter keyed by client identifier.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, identifier: &str, limit: RateLimit) -> AppResult<RateLimitDecision>;
}

/// Redis cache wrapper with connection pooling.
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
}

impl Cache {
    /// Connect to Redis.
    pub async fn connect(config: &CacheConfig) -> Result<Self, RedisError> {
        let client = Client::open(config.url.as_str())?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Redis cache connected");

        Ok(Self { connection })
    }

    /// Check connectivity for health reporting.
    pub async fn ping(&self) -> bool {
        let mut conn = self.connection.clone();
        let pong: Result<String, RedisError> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok()
    }
}

/// Count one request and make sure the window expires.
///
/// A counter left without a TTL (e.g. the connection dropped between the
/// two writes) gets its window re-armed instead of living forever.
const RATE_LIMIT_SCRIPT: &str = r#"
    local count = redis.call("INCR", KEYS[1])
    local ttl = redis.call("TTL", KEYS[1])
    if ttl < 0 then
        redis.call("EXPIRE", KEYS[1], ARGV[1])
        ttl = tonumber(ARGV[1])
    end
    return {count, ttl}
"#;

#[async_trait]
impl RateLimiter for Cache {
    async fn check(&self, identifier: &str, limit: RateLimit) -> AppResult<RateLimitDecision> {
        let key = format!("{}{}", CACHE_PREFIX_RATE_LIMIT, identifier);
        let mut conn = self.connection.clone();

        let (count, ttl): (u64, i64) = redis::cmd("EVAL")
            .arg(RATE_LIMIT_SCRIPT)
            .arg(1)
            .arg(&key)
            .arg(limit.window_seconds)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;

        Ok(RateLimitDecision::from_count(count, limit, ttl))
    }
}

fn cache_error(e: RedisError) -> AppError {
    tracing::error!("Redis error: {}", e);
    AppError::from(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: RateLimit = RateLimit {
        max_requests: 10,
        window_seconds: 3600,
    };

    #[test]
    fn test_decision_within_limit() {
        let decision = RateLimitDecision::from_count(10, LIMIT, 120);
        assert!(decision.allowed);
        assert_eq!(decision.remaining(LIMIT), 0);
        assert_eq!(decision.retry_after, 120);
    }

    #[test]
    fn test_decision_over_limit() {
        let decision = RateLimitDecision::from_count(11, LIMIT, 5);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining(LIMIT), 0);
    }

    #[test]
    fn test_missing_ttl_falls_back_to_window() {
        let decision = RateLimitDecision::from_count(1, LIMIT, -1);
        assert_eq!(decision.retry_after, 3600);
        assert_eq!(decision.remaining(LIMIT), 9);
    }

    #[test]
    fn test_script_counts_then_rearms_missing_expiry() {
        let incr = RATE_LIMIT_SCRIPT.find(r#"redis.call("INCR""#).unwrap();
        let guard = RATE_LIMIT_SCRIPT.find("if ttl < 0 then").unwrap();
        let expire = RATE_LIMIT_SCRIPT.find(r#"redis.call("EXPIRE""#).unwrap();

        // EXPIRE only runs behind the TTL guard, after counting
        assert!(incr < guard && guard < expire);
        assert_eq!(RATE_LIMIT_SCRIPT.matches("EXPIRE").count(), 1);
    }

    #[test]
    fn test_rearmed_window_reports_full_retry() {
        // The script hands back the fresh window length after re-arming
        let decision = RateLimitDecision::from_count(11, LIMIT, LIMIT.window_seconds as i64);
        assert!(!decision.allowed);
        assert_eq!(decision.retry_after, 3600);
    }
}
