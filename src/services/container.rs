//! Service Container - Centralized service access.
//!
//! Provider clients and stores are built once at start-up and handed to
//! the services here, never reached through globals.

use std::sync::Arc;

use super::{
    AuthManager, AuthService, PlaceManager, PlaceService, ScanNearbySearch, UserManager,
    UserService,
};
use crate::infra::{CredentialVerifier, IdentityProvider, PlaceRepository, UserRepository};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthService>;

    fn users(&self) -> Arc<dyn UserService>;

    fn places(&self) -> Arc<dyn PlaceService>;
}

/// Concrete implementation of ServiceContainer
#[derive(Clone)]
pub struct Services {
    auth_service: Arc<dyn AuthService>,
    user_service: Arc<dyn UserService>,
    place_service: Arc<dyn PlaceService>,
}

impl Services {
    /// Wire every service from its collaborators.
    pub fn from_parts(
        users: Arc<dyn UserRepository>,
        places: Arc<dyn PlaceRepository>,
        identity: Arc<dyn IdentityProvider>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        let nearby = Arc::new(ScanNearbySearch::new(places.clone()));

        Self {
            auth_service: Arc::new(AuthManager::new(users.clone(), identity.clone(), verifier)),
            user_service: Arc::new(UserManager::new(users, identity)),
            place_service: Arc::new(PlaceManager::new(places, nearby)),
        }
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }

    fn users(&self) -> Arc<dyn UserService> {
        self.user_service.clone()
    }

    fn places(&self) -> Arc<dyn PlaceService> {
        self.place_service.clone()
    }
}
