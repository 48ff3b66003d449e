//! Infrastructure layer - External systems integration
//!
//! This module handles all external system concerns:
//! - Database connections and repositories
//! - The identity provider and token verification
//! - Rate-limit counters (Redis)

pub mod cache;
pub mod db;
pub mod identity;
pub mod repositories;

pub use cache::{Cache, RateLimitDecision, RateLimiter};
pub use db::{Database, Migrator};
pub use identity::{
    CredentialVerifier, FirebaseIdentity, FirebaseTokenVerifier, IdentityError, IdentityProvider,
    ProviderAccount, Session, SignedIn, TokenError, VerifiedToken,
};
pub use repositories::{PlaceRepository, PlaceStore, UserRepository, UserStore};

#[cfg(any(test, feature = "test-utils"))]
pub use cache::MockRateLimiter;
#[cfg(any(test, feature = "test-utils"))]
pub use identity::{FakeIdentity, MockCredentialVerifier, MockIdentityProvider};
#[cfg(any(test, feature = "test-utils"))]
pub use repositories::{
    InMemoryPlaceRepository, InMemoryUserRepository, MockPlaceRepository, MockUserRepository,
};
