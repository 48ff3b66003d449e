//! Repository layer - Data access abstraction
//!
//! Repositories provide an abstraction over data persistence,
//! following the Repository pattern for clean separation of concerns.

pub(crate) mod entities;
mod place_repository;
mod user_repository;

#[cfg(any(test, feature = "test-utils"))]
mod memory;

pub use place_repository::{PlaceRepository, PlaceStore};
pub use user_repository::{UserRepository, UserStore};

// Export mocks and fakes for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{InMemoryPlaceRepository, InMemoryUserRepository};
#[cfg(any(test, feature = "test-utils"))]
pub use place_repository::MockPlaceRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
