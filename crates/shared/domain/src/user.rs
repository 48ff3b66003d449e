//! User profile entity and related types.
//!
//! The profile is keyed by the identity provider's `uid`; it is never
//! generated locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{ROLE_ADMIN, ROLE_USER};
use crate::lifecycle::SoftDelete;

/// User roles enumeration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    /// Check if this role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Strict parse: only the exact role names are accepted
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            ROLE_USER => Some(UserRole::User),
            ROLE_ADMIN => Some(UserRole::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => ROLE_ADMIN,
            UserRole::User => ROLE_USER,
        }
    }
}

/// Lenient conversion used when reading stored values: unknown roles
/// degrade to `user`.
impl From<&str> for UserRole {
    fn from(s: &str) -> Self {
        UserRole::parse(s).unwrap_or_default()
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User profile entity
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub uid: String,
    pub email: String,
    pub nome: String,
    pub cognome: String,
    pub ruolo: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft delete timestamp (None = active, Some = deleted)
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new active profile
    pub fn new(new: NewUser, now: DateTime<Utc>) -> Self {
        Self {
            uid: new.uid,
            email: new.email,
            nome: new.nome,
            cognome: new.cognome,
            ruolo: new.ruolo,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Check if user has admin role
    pub fn is_admin(&self) -> bool {
        self.ruolo.is_admin()
    }

    /// Merge allow-listed fields. Returns true when the role changed.
    pub fn apply(&mut self, patch: UserPatch, now: DateTime<Utc>) -> bool {
        let previous_role = self.ruolo;

        if let Some(nome) = patch.nome {
            self.nome = nome;
        }
        if let Some(cognome) = patch.cognome {
            self.cognome = cognome;
        }
        if let Some(ruolo) = patch.ruolo {
            self.ruolo = ruolo;
        }
        self.updated_at = now;

        previous_role != self.ruolo
    }
}

impl SoftDelete for User {
    const ENTITY: &'static str = "User";

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>) {
        self.deleted_at = at;
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

/// Profile creation data
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub uid: String,
    pub email: String,
    pub nome: String,
    pub cognome: String,
    pub ruolo: UserRole,
}

/// Allow-listed profile update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub nome: Option<String>,
    pub cognome: Option<String>,
    pub ruolo: Option<UserRole>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.nome.is_none() && self.cognome.is_none() && self.ruolo.is_none()
    }
}

/// User response (safe to return to client)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// Identity provider user id
    pub uid: String,
    pub email: String,
    pub nome: String,
    pub cognome: String,
    pub ruolo: UserRole,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            is_deleted: user.is_deleted(),
            uid: user.uid,
            email: user.email,
            nome: user.nome,
            cognome: user.cognome,
            ruolo: user.ruolo,
            deleted_at: user.deleted_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse::from(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user() -> User {
        User::new(
            NewUser {
                uid: "u1".to_string(),
                email: "mario@example.com".to_string(),
                nome: "Mario".to_string(),
                cognome: "Rossi".to_string(),
                ruolo: UserRole::User,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_role_parse_is_strict() {
        assert_eq!(UserRole::parse("admin"), Some(UserRole::Admin));
        assert_eq!(UserRole::parse("user"), Some(UserRole::User));
        assert_eq!(UserRole::parse("Admin"), None);
        assert_eq!(UserRole::parse("superuser"), None);
    }

    #[test]
    fn test_role_from_str_defaults_to_user() {
        assert_eq!(UserRole::from("moderator"), UserRole::User);
        assert_eq!(UserRole::from("admin"), UserRole::Admin);
    }

    #[test]
    fn test_apply_reports_role_change() {
        let mut user = new_user();

        let changed = user.apply(
            UserPatch {
                nome: Some("Luigi".to_string()),
                ..Default::default()
            },
            Utc::now(),
        );
        assert!(!changed);
        assert_eq!(user.nome, "Luigi");

        let changed = user.apply(
            UserPatch {
                ruolo: Some(UserRole::Admin),
                ..Default::default()
            },
            Utc::now(),
        );
        assert!(changed);
        assert!(user.is_admin());
    }

    #[test]
    fn test_response_exposes_deleted_flag() {
        let mut user = new_user();
        user.soft_delete(Utc::now()).unwrap();

        let json = serde_json::to_value(UserResponse::from(&user)).unwrap();
        assert_eq!(json["isDeleted"], true);
        assert!(json["deletedAt"].is_string());
        assert_eq!(json["ruolo"], "user");
    }

    #[test]
    fn test_empty_patch() {
        assert!(UserPatch::default().is_empty());
    }
}
