//! User profile repository with soft delete support.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, SqlErr,
};

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use common::{AppError, AppResult};
use domain::User;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

const MSG_USER_EXISTS: &str = "User already exists";

/// User repository trait for dependency injection.
///
/// By default, all query methods exclude soft-deleted records.
/// Use `*_with_deleted` variants to include them.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find active profile by uid (excludes soft-deleted)
    async fn find_by_uid(&self, uid: &str) -> AppResult<Option<User>>;

    /// Find profile by uid including soft-deleted
    async fn find_by_uid_with_deleted(&self, uid: &str) -> AppResult<Option<User>>;

    /// List all active profiles
    async fn list(&self) -> AppResult<Vec<User>>;

    /// List all profiles including soft-deleted
    async fn list_with_deleted(&self) -> AppResult<Vec<User>>;

    /// Insert a new profile. Fails with `Conflict` if the uid exists.
    async fn create(&self, user: User) -> AppResult<User>;

    /// Persist the merged profile fields
    async fn update(&self, user: User) -> AppResult<User>;

    /// Write the soft delete marker
    async fn set_deleted_at(
        &self,
        uid: &str,
        deleted_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Permanently remove the row. Returns false when nothing was deleted.
    async fn delete(&self, uid: &str) -> AppResult<bool>;
}

/// Postgres-backed profile store
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_uid(&self, uid: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(uid.to_string())
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;

        Ok(result.map(User::from))
    }

    async fn find_by_uid_with_deleted(&self, uid: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(uid.to_string())
            .one(&self.db)
            .await?;

        Ok(result.map(User::from))
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        let models = UserEntity::find()
            .filter(user::Column::DeletedAt.is_null())
            .order_by_asc(user::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(User::from).collect())
    }

    async fn list_with_deleted(&self) -> AppResult<Vec<User>> {
        let models = UserEntity::find()
            .order_by_asc(user::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(User::from).collect())
    }

    async fn create(&self, user: User) -> AppResult<User> {
        if self.find_by_uid_with_deleted(&user.uid).await?.is_some() {
            return Err(AppError::conflict(MSG_USER_EXISTS));
        }

        // A concurrent insert can still win the race for the primary key
        let active: ActiveModel = user.into();
        let model = active.insert(&self.db).await.map_err(map_insert_error)?;
        Ok(User::from(model))
    }

    async fn update(&self, user: User) -> AppResult<User> {
        // Email and timestamps other than updated_at are immutable
        let active = ActiveModel {
            uid: Set(user.uid),
            nome: Set(user.nome),
            cognome: Set(user.cognome),
            ruolo: Set(user.ruolo.to_string()),
            updated_at: Set(user.updated_at),
            ..Default::default()
        };

        let model = active.update(&self.db).await?;
        Ok(User::from(model))
    }

    async fn set_deleted_at(
        &self,
        uid: &str,
        deleted_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let active = ActiveModel {
            uid: Set(uid.to_string()),
            deleted_at: Set(deleted_at),
            updated_at: Set(updated_at),
            ..Default::default()
        };

        active.update(&self.db).await?;
        Ok(())
    }

    async fn delete(&self, uid: &str) -> AppResult<bool> {
        let result = UserEntity::delete_by_id(uid.to_string())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

fn is_unique_violation(err: Option<SqlErr>) -> bool {
    matches!(err, Some(SqlErr::UniqueConstraintViolation(_)))
}

fn map_insert_error(err: DbErr) -> AppError {
    if is_unique_violation(err.sql_err()) {
        AppError::conflict(MSG_USER_EXISTS)
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_detected() {
        let err = SqlErr::UniqueConstraintViolation(
            "duplicate key value violates unique constraint \"users_pkey\"".to_string(),
        );
        assert!(is_unique_violation(Some(err)));
    }

    #[test]
    fn test_other_sql_errors_are_not_unique_violations() {
        let err = SqlErr::ForeignKeyConstraintViolation("fk".to_string());
        assert!(!is_unique_violation(Some(err)));
        assert!(!is_unique_violation(None));
    }

    #[test]
    fn test_non_constraint_insert_error_stays_database() {
        let err = map_insert_error(DbErr::Custom("connection reset".to_string()));
        assert!(matches!(err, AppError::Database(_)));
    }
}
