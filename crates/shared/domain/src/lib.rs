//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies:
//! user profiles and places, the soft-delete lifecycle they share, the
//! access-control policies, and the geodistance used by nearby search.

pub mod access;
pub mod constants;
pub mod distance;
pub mod error;
pub mod lifecycle;
pub mod nearby;
pub mod place;
pub mod user;

pub use access::{authorize, authorize_all, AccessError, Policy, Principal};
pub use constants::*;
pub use distance::distance_km;
pub use error::{DomainError, DomainResult};
pub use lifecycle::{LifecycleError, LifecycleState, SoftDelete};
pub use nearby::{NearbyPlace, NearbyQuery};
pub use place::{
    Category, Contact, Location, NewPlace, OpeningHours, Place, PlaceFilter, PlacePatch,
    PlaceResponse, TimeRange,
};
pub use user::{NewUser, User, UserPatch, UserResponse, UserRole};
