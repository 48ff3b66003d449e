//! In-memory repositories for integration tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{PlaceRepository, UserRepository};
use common::{AppError, AppResult};
use domain::{NewPlace, Place, PlaceFilter, SoftDelete, User};

/// Profile store backed by a map
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile directly
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.uid.clone(), user);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_uid(&self, uid: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(uid).filter(|u| !u.is_deleted()).cloned())
    }

    async fn find_by_uid_with_deleted(&self, uid: &str) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(uid).cloned())
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .filter(|u| !u.is_deleted())
            .cloned()
            .collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn list_with_deleted(&self) -> AppResult<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn create(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.uid) {
            return Err(AppError::conflict("User already exists"));
        }
        users.insert(user.uid.clone(), user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write().await;
        let stored = users
            .get_mut(&user.uid)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        stored.nome = user.nome;
        stored.cognome = user.cognome;
        stored.ruolo = user.ruolo;
        stored.updated_at = user.updated_at;
        Ok(stored.clone())
    }

    async fn set_deleted_at(
        &self,
        uid: &str,
        deleted_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut users = self.users.write().await;
        let stored = users
            .get_mut(uid)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        stored.deleted_at = deleted_at;
        stored.updated_at = updated_at;
        Ok(())
    }

    async fn delete(&self, uid: &str) -> AppResult<bool> {
        Ok(self.users.write().await.remove(uid).is_some())
    }
}

/// Place store backed by a map with sequential ids
#[derive(Default)]
pub struct InMemoryPlaceRepository {
    places: RwLock<HashMap<String, Place>>,
    next_id: RwLock<u64>,
}

impl InMemoryPlaceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlaceRepository for InMemoryPlaceRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Place>> {
        let places = self.places.read().await;
        Ok(places.get(id).filter(|p| !p.is_deleted()).cloned())
    }

    async fn find_by_id_with_deleted(&self, id: &str) -> AppResult<Option<Place>> {
        Ok(self.places.read().await.get(id).cloned())
    }

    async fn list(&self, filter: PlaceFilter) -> AppResult<Vec<Place>> {
        let mut places: Vec<Place> = self
            .places
            .read()
            .await
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        places.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(places)
    }

    async fn list_listed(&self) -> AppResult<Vec<Place>> {
        Ok(self
            .places
            .read()
            .await
            .values()
            .filter(|p| p.is_listed())
            .cloned()
            .collect())
    }

    async fn create(&self, new_place: NewPlace, now: DateTime<Utc>) -> AppResult<Place> {
        let id = {
            let mut next = self.next_id.write().await;
            *next += 1;
            format!("place-{}", *next)
        };
        let place = Place::new(id, new_place, now);
        self.places
            .write()
            .await
            .insert(place.id.clone(), place.clone());
        Ok(place)
    }

    async fn update(&self, place: Place) -> AppResult<Place> {
        let mut places = self.places.write().await;
        let stored = places
            .get_mut(&place.id)
            .ok_or_else(|| AppError::not_found("Place not found"))?;
        let Place {
            created_by,
            created_at,
            deleted_at,
            rating,
            reviews_count,
            ..
        } = stored.clone();
        *stored = Place {
            created_by,
            created_at,
            deleted_at,
            rating,
            reviews_count,
            ..place
        };
        Ok(stored.clone())
    }

    async fn set_deleted_at(
        &self,
        id: &str,
        deleted_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut places = self.places.write().await;
        let stored = places
            .get_mut(id)
            .ok_or_else(|| AppError::not_found("Place not found"))?;
        stored.deleted_at = deleted_at;
        stored.updated_at = updated_at;
        Ok(())
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        Ok(self.places.write().await.remove(id).is_some())
    }
}
