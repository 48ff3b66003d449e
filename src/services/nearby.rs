//! Nearby search strategy.
//!
//! The only implementation scans every listed place; a spatial index can
//! replace it behind the same trait.

use async_trait::async_trait;
use std::sync::Arc;

use crate::infra::PlaceRepository;
use common::AppResult;
use domain::{nearby, NearbyPlace, NearbyQuery};

#[async_trait]
pub trait NearbySearch: Send + Sync {
    /// Listed places within the radius, nearest first
    async fn search(&self, query: &NearbyQuery) -> AppResult<Vec<NearbyPlace>>;
}

/// Full-scan haversine filter over all listed places
pub struct ScanNearbySearch {
    places: Arc<dyn PlaceRepository>,
}

impl ScanNearbySearch {
    pub fn new(places: Arc<dyn PlaceRepository>) -> Self {
        Self { places }
    }
}

#[async_trait]
impl NearbySearch for ScanNearbySearch {
    async fn search(&self, query: &NearbyQuery) -> AppResult<Vec<NearbyPlace>> {
        let candidates = self.places.list_listed().await?;
        tracing::debug!(candidates = candidates.len(), radius = query.radius_km, "Nearby scan");
        Ok(nearby::scan(candidates, query))
    }
}
