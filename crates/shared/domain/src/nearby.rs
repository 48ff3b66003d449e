//! Nearby search over a candidate set of places.
//!
//! This is a full scan: every listed candidate is measured and filtered.
//! Storage adapters decide which candidates to hand in.

use std::cmp::Ordering;

use crate::constants::{DEFAULT_NEARBY_RADIUS_KM, DISTANCE_DISPLAY_DECIMALS, MAX_NEARBY_RADIUS_KM};
use crate::distance::{distance_km, round_to};
use crate::error::{DomainError, DomainResult};
use crate::place::Place;

pub const MSG_INVALID_NEARBY_PARAMS: &str = "Invalid parameters: lat and lng are required";

/// Validated nearby query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

impl NearbyQuery {
    /// Validate raw coordinates. `radius` falls back to the default when absent.
    pub fn new(latitude: f64, longitude: f64, radius: Option<f64>) -> DomainResult<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(DomainError::validation(MSG_INVALID_NEARBY_PARAMS));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(DomainError::validation("Latitude must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(DomainError::validation("Longitude must be between -180 and 180"));
        }

        let radius_km = radius.unwrap_or(DEFAULT_NEARBY_RADIUS_KM);
        if !radius_km.is_finite() || radius_km <= 0.0 || radius_km > MAX_NEARBY_RADIUS_KM {
            return Err(DomainError::validation(format!(
                "Radius must be greater than 0 and at most {MAX_NEARBY_RADIUS_KM}"
            )));
        }

        Ok(Self {
            latitude,
            longitude,
            radius_km,
        })
    }

    /// Exact distance from the query point to a place.
    pub fn distance_to(&self, place: &Place) -> f64 {
        distance_km(
            self.latitude,
            self.longitude,
            place.location.latitude,
            place.location.longitude,
        )
    }
}

/// A place found by a nearby search, with its display distance.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyPlace {
    pub place: Place,
    /// Kilometres, rounded for display
    pub distance_km: f64,
}

/// Keep listed places within the radius, nearest first.
///
/// Inclusion uses the exact distance; rounding is applied afterwards.
pub fn scan(candidates: impl IntoIterator<Item = Place>, query: &NearbyQuery) -> Vec<NearbyPlace> {
    let mut hits: Vec<(f64, Place)> = candidates
        .into_iter()
        .filter(Place::is_listed)
        .map(|place| (query.distance_to(&place), place))
        .filter(|(distance, _)| *distance <= query.radius_km)
        .collect();

    hits.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    hits.into_iter()
        .map(|(distance, place)| NearbyPlace {
            place,
            distance_km: round_to(distance, DISTANCE_DISPLAY_DECIMALS),
        })
        .collect()
}
