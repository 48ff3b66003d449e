//! Place service - catalogue reads, ownership-gated writes and lifecycle.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::nearby::NearbySearch;
use crate::infra::PlaceRepository;
use common::{AppError, AppResult, OptionExt};
use domain::{
    authorize, Category, NearbyPlace, NearbyQuery, NewPlace, Place, PlaceFilter, PlacePatch,
    Policy, Principal, SoftDelete,
};

pub const MSG_PLACE_NOT_FOUND: &str = "Place not found";
pub const MSG_EMPTY_PLACE_UPDATE: &str = "At least one field must be provided";
pub const MSG_VERIFY_FORBIDDEN: &str = "Only admins can verify a place";

#[async_trait]
pub trait PlaceService: Send + Sync {
    /// Non-deleted places matching the filter
    async fn list(&self, filter: PlaceFilter) -> AppResult<Vec<Place>>;

    /// Non-deleted places of one category, given by name
    async fn list_by_category(&self, category: &str) -> AppResult<Vec<Place>>;

    /// Non-deleted places created by a user
    async fn list_by_owner(&self, uid: &str) -> AppResult<Vec<Place>>;

    async fn get(&self, id: &str) -> AppResult<Place>;

    async fn nearby(&self, query: NearbyQuery) -> AppResult<Vec<NearbyPlace>>;

    /// Create a place owned by the caller
    async fn create(&self, principal: &Principal, place: NewPlace) -> AppResult<Place>;

    /// Owner or admin: merge allow-listed fields
    async fn update(&self, principal: &Principal, id: &str, patch: PlacePatch) -> AppResult<Place>;

    /// Owner or admin: hide the place
    async fn soft_delete(&self, principal: &Principal, id: &str) -> AppResult<()>;

    /// Admin: remove the place for good
    async fn hard_delete(&self, principal: &Principal, id: &str) -> AppResult<()>;

    /// Admin: bring a soft-deleted place back
    async fn restore(&self, principal: &Principal, id: &str) -> AppResult<Place>;
}

/// Concrete implementation of PlaceService.
pub struct PlaceManager {
    places: Arc<dyn PlaceRepository>,
    nearby: Arc<dyn NearbySearch>,
}

impl PlaceManager {
    pub fn new(places: Arc<dyn PlaceRepository>, nearby: Arc<dyn NearbySearch>) -> Self {
        Self { places, nearby }
    }
}

#[async_trait]
impl PlaceService for PlaceManager {
    async fn list(&self, filter: PlaceFilter) -> AppResult<Vec<Place>> {
        self.places.list(filter).await
    }

    async fn list_by_category(&self, category: &str) -> AppResult<Vec<Place>> {
        let category: Category = category.parse()?;
        self.places.list(PlaceFilter::by_category(category)).await
    }

    async fn list_by_owner(&self, uid: &str) -> AppResult<Vec<Place>> {
        self.places.list(PlaceFilter::by_owner(uid)).await
    }

    async fn get(&self, id: &str) -> AppResult<Place> {
        self.places
            .find_by_id(id)
            .await?
            .ok_or_not_found(MSG_PLACE_NOT_FOUND)
    }

    async fn nearby(&self, query: NearbyQuery) -> AppResult<Vec<NearbyPlace>> {
        self.nearby.search(&query).await
    }

    async fn create(&self, principal: &Principal, place: NewPlace) -> AppResult<Place> {
        authorize(Some(principal), Policy::AuthenticatedAny)?;

        // Ownership is always the caller
        let place = NewPlace {
            created_by: principal.uid.clone(),
            ..place
        };

        let place = self.places.create(place, Utc::now()).await?;
        tracing::info!(id = %place.id, owner = %place.created_by, "Place created");
        Ok(place)
    }

    async fn update(&self, principal: &Principal, id: &str, patch: PlacePatch) -> AppResult<Place> {
        // Existence before ownership: a missing place is always 404
        let mut place = self
            .places
            .find_by_id(id)
            .await?
            .ok_or_not_found(MSG_PLACE_NOT_FOUND)?;
        authorize(Some(principal), Policy::OwnerOrAdmin(&place.created_by))?;

        if patch.is_empty() {
            return Err(AppError::validation(MSG_EMPTY_PLACE_UPDATE));
        }
        if patch.is_verified.is_some() && !principal.is_admin() {
            return Err(AppError::forbidden(MSG_VERIFY_FORBIDDEN));
        }

        place.apply(patch, Utc::now());
        self.places.update(place).await
    }

    async fn soft_delete(&self, principal: &Principal, id: &str) -> AppResult<()> {
        let mut place = self
            .places
            .find_by_id_with_deleted(id)
            .await?
            .ok_or_not_found(MSG_PLACE_NOT_FOUND)?;
        authorize(Some(principal), Policy::OwnerOrAdmin(&place.created_by))?;

        place.soft_delete(Utc::now())?;
        self.places
            .set_deleted_at(id, place.deleted_at, place.updated_at)
            .await?;

        tracing::info!(id = %id, by = %principal.uid, "Place soft-deleted");
        Ok(())
    }

    async fn hard_delete(&self, principal: &Principal, id: &str) -> AppResult<()> {
        authorize(Some(principal), Policy::AdminOnly)?;

        if !self.places.delete(id).await? {
            return Err(AppError::not_found(MSG_PLACE_NOT_FOUND));
        }

        tracing::info!(id = %id, by = %principal.uid, "Place permanently deleted");
        Ok(())
    }

    async fn restore(&self, principal: &Principal, id: &str) -> AppResult<Place> {
        authorize(Some(principal), Policy::AdminOnly)?;

        let mut place = self
            .places
            .find_by_id_with_deleted(id)
            .await?
            .ok_or_not_found(MSG_PLACE_NOT_FOUND)?;

        place.restore(Utc::now())?;
        self.places
            .set_deleted_at(id, place.deleted_at, place.updated_at)
            .await?;

        tracing::info!(id = %id, by = %principal.uid, "Place restored");
        Ok(place)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::MockPlaceRepository;
    use crate::services::ScanNearbySearch;
    use domain::{Contact, Location, OpeningHours, UserRole};
    use mockall::predicate::*;

    fn principal(uid: &str, role: UserRole) -> Principal {
        Principal {
            uid: uid.to_string(),
            email: Some(format!("{uid}@example.com")),
            email_verified: true,
            role,
        }
    }

    fn place(id: &str, owner: &str) -> Place {
        Place::new(
            id.to_string(),
            NewPlace {
                name: "Bio Market".to_string(),
                description: None,
                location: Location {
                    latitude: 41.90,
                    longitude: 12.49,
                    address: None,
                    city: None,
                    country: None,
                },
                category: Category::Market,
                tags: vec![],
                opening_hours: OpeningHours::new(),
                contact: Contact::default(),
                created_by: owner.to_string(),
            },
            Utc::now(),
        )
    }

    fn manager(repo: MockPlaceRepository) -> PlaceManager {
        let repo: Arc<dyn PlaceRepository> = Arc::new(repo);
        PlaceManager::new(repo.clone(), Arc::new(ScanNearbySearch::new(repo)))
    }

    #[tokio::test]
    async fn test_update_missing_place_is_not_found_before_ownership() {
        let mut repo = MockPlaceRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let err = manager(repo)
            .update(
                &principal("stranger", UserRole::User),
                "p1",
                PlacePatch {
                    name: Some("New".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_owner_cannot_verify() {
        let mut repo = MockPlaceRepository::new();
        repo.expect_find_by_id()
            .with(eq("p1"))
            .returning(|id| Ok(Some(place(id, "owner"))));

        let err = manager(repo)
            .update(
                &principal("owner", UserRole::User),
                "p1",
                PlacePatch {
                    is_verified: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(err.to_string(), MSG_VERIFY_FORBIDDEN);
    }

    #[tokio::test]
    async fn test_empty_patch_rejected() {
        let mut repo = MockPlaceRepository::new();
        repo.expect_find_by_id()
            .returning(|id| Ok(Some(place(id, "owner"))));

        let err = manager(repo)
            .update(&principal("owner", UserRole::User), "p1", PlacePatch::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_soft_delete_twice_conflicts() {
        let mut repo = MockPlaceRepository::new();
        repo.expect_find_by_id_with_deleted().returning(|id| {
            let mut p = place(id, "owner");
            p.soft_delete(Utc::now()).unwrap();
            Ok(Some(p))
        });

        let err = manager(repo)
            .soft_delete(&principal("owner", UserRole::User), "p1")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.to_string(), "Place already deleted");
    }

    #[tokio::test]
    async fn test_create_stamps_caller_as_owner() {
        let mut repo = MockPlaceRepository::new();
        repo.expect_create()
            .withf(|new_place, _| new_place.created_by == "u1")
            .returning(|new_place, now| Ok(Place::new("p1".to_string(), new_place, now)));

        let mut draft = place("ignored", "someone-else");
        draft.created_by = "someone-else".to_string();
        let new_place = NewPlace {
            name: draft.name,
            description: draft.description,
            location: draft.location,
            category: draft.category,
            tags: draft.tags,
            opening_hours: draft.opening_hours,
            contact: draft.contact,
            created_by: draft.created_by,
        };

        let created = manager(repo)
            .create(&principal("u1", UserRole::User), new_place)
            .await
            .unwrap();

        assert_eq!(created.created_by, "u1");
        assert!(!created.is_verified);
        assert!(created.is_active);
    }

    #[tokio::test]
    async fn test_unknown_category_is_validation() {
        let err = manager(MockPlaceRepository::new())
            .list_by_category("pub")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }
}
