//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// User Roles
// =============================================================================

/// Default role assigned to new users
pub const ROLE_USER: &str = "user";

/// Administrator role with elevated privileges
pub const ROLE_ADMIN: &str = "admin";

// =============================================================================
// Place Validation
// =============================================================================

/// Most tags a place may carry
pub const MAX_TAGS: u64 = 10;

/// Longest accepted tag, in characters
pub const MAX_TAG_LENGTH: usize = 30;

// =============================================================================
// Geo
// =============================================================================

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Radius applied to nearby searches when the caller omits one
pub const DEFAULT_NEARBY_RADIUS_KM: f64 = 10.0;

/// Largest radius a nearby search may request
pub const MAX_NEARBY_RADIUS_KM: f64 = 100.0;

/// Decimal places kept on distances returned to clients
pub const DISTANCE_DISPLAY_DECIMALS: i32 = 2;
