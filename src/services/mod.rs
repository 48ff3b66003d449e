//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases. They depend on abstractions (traits) for
//! dependency inversion.

mod auth_service;
pub mod container;
mod nearby;
mod place_service;
mod user_service;

// Service Container
pub use container::{ServiceContainer, Services};

// Service traits and implementations
pub use auth_service::{
    AuthManager, AuthService, AuthSession, ProfileSummary, SessionInfo, SessionTokens,
    MSG_INVALID_ROLE,
};
pub use nearby::{NearbySearch, ScanNearbySearch};
pub use place_service::{PlaceManager, PlaceService};
pub use user_service::{UserManager, UserService};

#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;
