//! User service - Handles profile use cases.
//!
//! Every operation receives the calling principal and checks its own
//! policy, so handlers cannot forget one.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::infra::{IdentityProvider, UserRepository};
use common::{AppError, AppResult, OptionExt};
use domain::{
    authorize, NewUser, Policy, Principal, SoftDelete, User, UserPatch, UserRole,
};

pub const MSG_USER_NOT_FOUND: &str = "User not found";
pub const MSG_EMPTY_UPDATE: &str = "At least one field must be provided for the update";
pub const MSG_ROLE_CHANGE_FORBIDDEN: &str = "Only admins can change the role";
pub const MSG_ROLE_ASSIGN_FORBIDDEN: &str = "Only admins can assign a role other than user";

/// User service trait for dependency injection.
///
/// By default, operations exclude soft-deleted users.
#[async_trait]
pub trait UserService: Send + Sync {
    /// The caller's own active profile
    async fn me(&self, principal: &Principal) -> AppResult<User>;

    /// Admin: list profiles, optionally including soft-deleted ones
    async fn list(&self, principal: &Principal, include_deleted: bool) -> AppResult<Vec<User>>;

    /// Self or admin: one active profile
    async fn get(&self, principal: &Principal, uid: &str) -> AppResult<User>;

    /// Create the caller's own profile
    async fn create(
        &self,
        principal: &Principal,
        nome: String,
        cognome: String,
        ruolo: Option<UserRole>,
    ) -> AppResult<User>;

    /// Self or admin: merge allow-listed fields
    async fn update(&self, principal: &Principal, uid: &str, patch: UserPatch) -> AppResult<User>;

    /// Self or admin: hide the profile
    async fn soft_delete(&self, principal: &Principal, uid: &str) -> AppResult<()>;

    /// Admin: remove the profile and the provider account
    async fn hard_delete(&self, principal: &Principal, uid: &str) -> AppResult<()>;

    /// Admin: bring a soft-deleted profile back
    async fn restore(&self, principal: &Principal, uid: &str) -> AppResult<User>;
}

/// Concrete implementation of UserService.
pub struct UserManager {
    users: Arc<dyn UserRepository>,
    identity: Arc<dyn IdentityProvider>,
}

impl UserManager {
    pub fn new(users: Arc<dyn UserRepository>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { users, identity }
    }

    async fn sync_role_claim(&self, user: &User) {
        if let Err(e) = self.identity.set_role_claim(&user.uid, user.ruolo).await {
            tracing::warn!(uid = %user.uid, "Role claim out of sync with profile: {}", e);
        }
    }
}

#[async_trait]
impl UserService for UserManager {
    async fn me(&self, principal: &Principal) -> AppResult<User> {
        authorize(Some(principal), Policy::AuthenticatedAny)?;

        self.users
            .find_by_uid(&principal.uid)
            .await?
            .ok_or_not_found(MSG_USER_NOT_FOUND)
    }

    async fn list(&self, principal: &Principal, include_deleted: bool) -> AppResult<Vec<User>> {
        authorize(Some(principal), Policy::AdminOnly)?;

        if include_deleted {
            self.users.list_with_deleted().await
        } else {
            self.users.list().await
        }
    }

    async fn get(&self, principal: &Principal, uid: &str) -> AppResult<User> {
        authorize(Some(principal), Policy::SelfOrAdmin(uid))?;

        self.users
            .find_by_uid(uid)
            .await?
            .ok_or_not_found(MSG_USER_NOT_FOUND)
    }

    async fn create(
        &self,
        principal: &Principal,
        nome: String,
        cognome: String,
        ruolo: Option<UserRole>,
    ) -> AppResult<User> {
        authorize(Some(principal), Policy::AuthenticatedAny)?;

        let ruolo = ruolo.unwrap_or_default();
        if ruolo != UserRole::User {
            authorize(Some(principal), Policy::AdminOnly)
                .map_err(|_| AppError::forbidden(MSG_ROLE_ASSIGN_FORBIDDEN))?;
        }

        let email = principal
            .email
            .clone()
            .ok_or_else(|| AppError::validation("Account has no email address"))?;

        let user = self
            .users
            .create(User::new(
                NewUser {
                    uid: principal.uid.clone(),
                    email,
                    nome,
                    cognome,
                    ruolo,
                },
                Utc::now(),
            ))
            .await?;

        self.sync_role_claim(&user).await;

        tracing::info!(uid = %user.uid, role = %user.ruolo, "Profile created");
        Ok(user)
    }

    async fn update(&self, principal: &Principal, uid: &str, patch: UserPatch) -> AppResult<User> {
        authorize(Some(principal), Policy::SelfOrAdmin(uid))?;

        if patch.is_empty() {
            return Err(AppError::validation(MSG_EMPTY_UPDATE));
        }
        if patch.ruolo.is_some() && !principal.is_admin() {
            return Err(AppError::forbidden(MSG_ROLE_CHANGE_FORBIDDEN));
        }

        let mut user = self
            .users
            .find_by_uid(uid)
            .await?
            .ok_or_not_found(MSG_USER_NOT_FOUND)?;

        let role_changed = user.apply(patch, Utc::now());
        let user = self.users.update(user).await?;

        if role_changed {
            self.sync_role_claim(&user).await;
        }

        Ok(user)
    }

    async fn soft_delete(&self, principal: &Principal, uid: &str) -> AppResult<()> {
        authorize(Some(principal), Policy::SelfOrAdmin(uid))?;

        let mut user = self
            .users
            .find_by_uid_with_deleted(uid)
            .await?
            .ok_or_not_found(MSG_USER_NOT_FOUND)?;

        user.soft_delete(Utc::now())?;
        self.users
            .set_deleted_at(uid, user.deleted_at, user.updated_at)
            .await?;

        tracing::info!(uid = %uid, by = %principal.uid, "User soft-deleted");
        Ok(())
    }

    async fn hard_delete(&self, principal: &Principal, uid: &str) -> AppResult<()> {
        authorize(Some(principal), Policy::AdminOnly)?;

        if !self.users.delete(uid).await? {
            return Err(AppError::not_found(MSG_USER_NOT_FOUND));
        }

        // The profile is gone either way; a leftover account is tolerated
        if let Err(e) = self.identity.delete_account(uid).await {
            tracing::warn!(uid = %uid, "Provider account not removed after hard delete: {}", e);
        }

        tracing::info!(uid = %uid, by = %principal.uid, "User permanently deleted");
        Ok(())
    }

    async fn restore(&self, principal: &Principal, uid: &str) -> AppResult<User> {
        authorize(Some(principal), Policy::AdminOnly)?;

        let mut user = self
            .users
            .find_by_uid_with_deleted(uid)
            .await?
            .ok_or_not_found(MSG_USER_NOT_FOUND)?;

        user.restore(Utc::now())?;
        self.users
            .set_deleted_at(uid, user.deleted_at, user.updated_at)
            .await?;

        tracing::info!(uid = %uid, by = %principal.uid, "User restored");
        Ok(user)
    }
}
