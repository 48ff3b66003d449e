//! Place repository.
//!
//! Reads exclude soft-deleted places unless the method says otherwise.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::place::{self, ActiveModel, Entity as PlaceEntity};
use common::AppResult;
use domain::{NewPlace, Place, PlaceFilter};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait PlaceRepository: Send + Sync {
    /// Find a non-deleted place by id
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Place>>;

    /// Find a place by id including soft-deleted
    async fn find_by_id_with_deleted(&self, id: &str) -> AppResult<Option<Place>>;

    /// Non-deleted places matching every set filter
    async fn list(&self, filter: PlaceFilter) -> AppResult<Vec<Place>>;

    /// Places shown on the map: active and not deleted
    async fn list_listed(&self) -> AppResult<Vec<Place>>;

    /// Insert a new place; the store assigns the id
    async fn create(&self, new_place: NewPlace, now: DateTime<Utc>) -> AppResult<Place>;

    /// Persist the merged place fields
    async fn update(&self, place: Place) -> AppResult<Place>;

    /// Write the soft delete marker
    async fn set_deleted_at(
        &self,
        id: &str,
        deleted_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Permanently remove the row. Returns false when nothing was deleted.
    async fn delete(&self, id: &str) -> AppResult<bool>;
}

/// Postgres-backed place store
pub struct PlaceStore {
    db: DatabaseConnection,
}

impl PlaceStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn into_places(models: Vec<place::Model>) -> AppResult<Vec<Place>> {
    models.into_iter().map(Place::try_from).collect()
}

#[async_trait]
impl PlaceRepository for PlaceStore {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Place>> {
        PlaceEntity::find_by_id(id.to_string())
            .filter(place::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .map(Place::try_from)
            .transpose()
    }

    async fn find_by_id_with_deleted(&self, id: &str) -> AppResult<Option<Place>> {
        PlaceEntity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(Place::try_from)
            .transpose()
    }

    async fn list(&self, filter: PlaceFilter) -> AppResult<Vec<Place>> {
        let mut query = PlaceEntity::find().filter(place::Column::DeletedAt.is_null());

        if let Some(category) = filter.category {
            query = query.filter(place::Column::Category.eq(category.as_str()));
        }
        if let Some(city) = filter.city {
            query = query.filter(place::Column::City.eq(city));
        }
        if let Some(is_verified) = filter.is_verified {
            query = query.filter(place::Column::IsVerified.eq(is_verified));
        }
        if let Some(created_by) = filter.created_by {
            query = query.filter(place::Column::CreatedBy.eq(created_by));
        }

        let models = query
            .order_by_desc(place::Column::CreatedAt)
            .all(&self.db)
            .await?;

        into_places(models)
    }

    async fn list_listed(&self) -> AppResult<Vec<Place>> {
        let models = PlaceEntity::find()
            .filter(place::Column::DeletedAt.is_null())
            .filter(place::Column::IsActive.eq(true))
            .all(&self.db)
            .await?;

        into_places(models)
    }

    async fn create(&self, new_place: NewPlace, now: DateTime<Utc>) -> AppResult<Place> {
        let place = Place::new(Uuid::new_v4().to_string(), new_place, now);
        let active = ActiveModel::try_from(place)?;
        let model = active.insert(&self.db).await?;
        Place::try_from(model)
    }

    async fn update(&self, place: Place) -> AppResult<Place> {
        let mut active = ActiveModel::try_from(place)?;
        // Creation fields never change on update
        active.created_by = sea_orm::ActiveValue::NotSet;
        active.created_at = sea_orm::ActiveValue::NotSet;
        active.rating = sea_orm::ActiveValue::NotSet;
        active.reviews_count = sea_orm::ActiveValue::NotSet;
        active.deleted_at = sea_orm::ActiveValue::NotSet;

        let model = active.update(&self.db).await?;
        Place::try_from(model)
    }

    async fn set_deleted_at(
        &self,
        id: &str,
        deleted_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let active = ActiveModel {
            id: Set(id.to_string()),
            deleted_at: Set(deleted_at),
            updated_at: Set(updated_at),
            ..Default::default()
        };

        active.update(&self.db).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = PlaceEntity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }
}
