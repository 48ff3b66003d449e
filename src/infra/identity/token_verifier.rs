//! ID token verification against the provider's published signing keys.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::{HeaderMap, CACHE_CONTROL};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{CredentialVerifier, FirebaseIdentity, IdentityError, TokenError, VerifiedToken};
use crate::config::{
    DEFAULT_SIGNING_KEYS_TTL_SECONDS, SIGNING_KEYS_MIN_REFRESH_SECONDS, TOKEN_ISSUER_PREFIX,
};
use common::IdentityConfig;

/// Claims read from a provider ID token.
#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    auth_time: Option<i64>,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    #[serde(default)]
    role: Option<String>,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
    expires_at: Instant,
}

impl CachedKeys {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    /// Whether an unknown `kid` may trigger a refetch. A fresh set is
    /// refetched at most once per [`SIGNING_KEYS_MIN_REFRESH_SECONDS`].
    fn may_refresh(&self, now: Instant) -> bool {
        !self.is_fresh(now)
            || now.saturating_duration_since(self.fetched_at)
                >= Duration::from_secs(SIGNING_KEYS_MIN_REFRESH_SECONDS)
    }

    fn decoding_key(&self, kid: &str) -> Option<Result<DecodingKey, TokenError>> {
        self.keys
            .find(kid)
            .map(|jwk| DecodingKey::from_jwk(jwk).map_err(|_| TokenError::Invalid))
    }
}

/// Verifies RS256 ID tokens and, optionally, their revocation state.
pub struct FirebaseTokenVerifier {
    client: Client,
    jwks_url: String,
    project_id: String,
    issuer: String,
    keys: RwLock<Option<CachedKeys>>,
    /// Account lookups for revocation checks; `None` disables them
    revocation: Option<Arc<FirebaseIdentity>>,
}

impl FirebaseTokenVerifier {
    pub fn new(client: Client, config: &IdentityConfig) -> Self {
        Self {
            client,
            jwks_url: config.jwks_url.clone(),
            project_id: config.project_id.clone(),
            issuer: format!("{}{}", TOKEN_ISSUER_PREFIX, config.project_id),
            keys: RwLock::new(None),
            revocation: None,
        }
    }

    /// Reject tokens issued before the account's last session revocation.
    pub fn with_revocation_check(mut self, identity: Arc<FirebaseIdentity>) -> Self {
        self.revocation = Some(identity);
        self
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);
        validation
    }

    /// Signing key for `kid`, refreshing the key set when it is stale or,
    /// rate limited, when the `kid` is unknown.
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, TokenError> {
        {
            let cached = self.keys.read().await;
            if let Some(cached) = cached.as_ref() {
                let now = Instant::now();
                if cached.is_fresh(now) {
                    if let Some(key) = cached.decoding_key(kid) {
                        return key;
                    }
                }
                if !cached.may_refresh(now) {
                    return Err(TokenError::Invalid);
                }
            }
        }

        let mut cached = self.keys.write().await;
        // Another request may have refreshed while we waited for the lock
        let now = Instant::now();
        let refresh = cached.as_ref().map_or(true, |c| {
            !c.is_fresh(now) || (c.may_refresh(now) && c.decoding_key(kid).is_none())
        });
        if refresh {
            let fresh = self.fetch_keys().await.map_err(|e| {
                tracing::error!("Failed to fetch token signing keys: {}", e);
                TokenError::Invalid
            })?;
            *cached = Some(fresh);
        }

        cached
            .as_ref()
            .and_then(|c| c.decoding_key(kid))
            .unwrap_or(Err(TokenError::Invalid))
    }

    async fn fetch_keys(&self) -> Result<CachedKeys, IdentityError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| IdentityError::unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IdentityError::unavailable(format!(
                "signing keys returned status {}",
                response.status().as_u16()
            )));
        }

        let ttl = max_age(response.headers()).unwrap_or(DEFAULT_SIGNING_KEYS_TTL_SECONDS);
        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| IdentityError::unavailable(format!("invalid key set: {}", e)))?;

        tracing::debug!(keys = keys.keys.len(), ttl, "Token signing keys refreshed");

        let now = Instant::now();
        Ok(CachedKeys {
            keys,
            fetched_at: now,
            expires_at: now + Duration::from_secs(ttl),
        })
    }

    async fn check_revoked(&self, claims: &IdTokenClaims) -> Result<(), TokenError> {
        let Some(identity) = &self.revocation else {
            return Ok(());
        };

        let valid_since = identity.valid_since(&claims.sub).await.map_err(|e| {
            tracing::warn!(uid = %claims.sub, "Revocation lookup failed: {}", e);
            TokenError::Invalid
        })?;

        if is_revoked(claims.auth_time.or(claims.iat), valid_since) {
            return Err(TokenError::Revoked);
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialVerifier for FirebaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let header = decode_header(token).map_err(|_| TokenError::Invalid)?;
        if header.alg != Algorithm::RS256 {
            return Err(TokenError::Invalid);
        }
        let kid = header.kid.ok_or(TokenError::Invalid)?;

        let key = self.decoding_key(&kid).await?;
        let data = decode::<IdTokenClaims>(token, &key, &self.validation()).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        let claims = data.claims;
        if claims.sub.is_empty() {
            return Err(TokenError::Invalid);
        }

        self.check_revoked(&claims).await?;

        Ok(VerifiedToken {
            uid: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified.unwrap_or(false),
            role_claim: claims.role,
        })
    }
}

/// `max-age` directive of a `Cache-Control` header, in seconds.
fn max_age(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CACHE_CONTROL)?
        .to_str()
        .ok()?
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|value| value.trim().parse().ok())
}

/// A token is revoked when it was issued before the account's `validSince`.
fn is_revoked(auth_time: Option<i64>, valid_since: Option<i64>) -> bool {
    match (auth_time, valid_since) {
        (Some(issued), Some(since)) => issued < since,
        (None, Some(_)) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_max_age_parsed_from_cache_control() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=19845, must-revalidate, no-transform"),
        );
        assert_eq!(max_age(&headers), Some(19845));
    }

    #[test]
    fn test_max_age_absent() {
        let mut headers = HeaderMap::new();
        assert_eq!(max_age(&headers), None);

        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        assert_eq!(max_age(&headers), None);
    }

    #[test]
    fn test_revocation_window() {
        assert!(is_revoked(Some(100), Some(200)));
        assert!(!is_revoked(Some(200), Some(200)));
        assert!(!is_revoked(Some(100), None));
        assert!(is_revoked(None, Some(1)));
    }

    fn cached(now: Instant, ttl: u64) -> CachedKeys {
        CachedKeys {
            keys: JwkSet { keys: vec![] },
            fetched_at: now,
            expires_at: now + Duration::from_secs(ttl),
        }
    }

    #[test]
    fn test_unknown_kid_refetch_is_throttled() {
        let now = Instant::now();
        let keys = cached(now, 3600);

        assert!(keys.is_fresh(now + Duration::from_secs(10)));
        assert!(!keys.may_refresh(now + Duration::from_secs(10)));
        assert!(keys.may_refresh(now + Duration::from_secs(SIGNING_KEYS_MIN_REFRESH_SECONDS)));
    }

    #[test]
    fn test_stale_keys_always_refetch() {
        let now = Instant::now();
        let keys = cached(now, 5);

        assert!(!keys.is_fresh(now + Duration::from_secs(6)));
        assert!(keys.may_refresh(now + Duration::from_secs(6)));
    }

    #[tokio::test]
    async fn test_unknown_kid_with_fresh_keys_skips_fetch() {
        let config = IdentityConfig {
            // Nothing listens here
            jwks_url: "http://127.0.0.1:9/keys".to_string(),
            ..IdentityConfig::default()
        };
        let verifier = FirebaseTokenVerifier::new(Client::new(), &config);
        let seeded_at = Instant::now();
        *verifier.keys.write().await = Some(cached(seeded_at, 3600));

        let result = verifier.decoding_key("made-up").await;

        assert!(matches!(result, Err(TokenError::Invalid)));
        let keys = verifier.keys.read().await;
        assert_eq!(keys.as_ref().map(|c| c.fetched_at), Some(seeded_at));
    }

    #[tokio::test]
    async fn test_garbage_token_is_invalid() {
        let verifier = FirebaseTokenVerifier::new(Client::new(), &IdentityConfig::default());
        assert_eq!(verifier.verify("not-a-jwt").await, Err(TokenError::Invalid));
    }
}
