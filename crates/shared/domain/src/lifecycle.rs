//! Soft-delete lifecycle shared by every persisted entity.
//!
//! An entity is either `Active` or `Deleted`; the state is derived from the
//! `deleted_at` timestamp so the flag and the timestamp can never disagree.
//! Hard deletion is outside this machine: the row simply stops existing.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Active,
    Deleted,
}

/// Rejected lifecycle transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("{0} already deleted")]
    AlreadyDeleted(&'static str),

    #[error("{0} is not deleted")]
    NotDeleted(&'static str),
}

/// Entities carrying a soft-delete marker.
///
/// Implementors expose their timestamps; the transitions are provided.
pub trait SoftDelete {
    /// Human-readable entity name used in error messages
    const ENTITY: &'static str;

    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>);

    fn touch(&mut self, at: DateTime<Utc>);

    fn state(&self) -> LifecycleState {
        if self.deleted_at().is_some() {
            LifecycleState::Deleted
        } else {
            LifecycleState::Active
        }
    }

    fn is_deleted(&self) -> bool {
        self.state() == LifecycleState::Deleted
    }

    /// Active -> Deleted. Stamps `deleted_at` and `updated_at` with `now`.
    fn soft_delete(&mut self, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        if self.is_deleted() {
            return Err(LifecycleError::AlreadyDeleted(Self::ENTITY));
        }
        self.set_deleted_at(Some(now));
        self.touch(now);
        Ok(())
    }

    /// Deleted -> Active. Clears `deleted_at` and stamps `updated_at`.
    fn restore(&mut self, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        if !self.is_deleted() {
            return Err(LifecycleError::NotDeleted(Self::ENTITY));
        }
        self.set_deleted_at(None);
        self.touch(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[derive(Debug, Clone, PartialEq)]
    struct Doc {
        body: String,
        updated_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
    }

    impl SoftDelete for Doc {
        const ENTITY: &'static str = "Doc";

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

    fn doc() -> Doc {
        Doc {
            body: "hello".to_string(),
            updated_at: Utc::now() - Duration::days(1),
            deleted_at: None,
        }
    }

    #[test]
    fn test_new_entity_is_active() {
        assert_eq!(doc().state(), LifecycleState::Active);
    }

    #[test]
    fn test_soft_delete_stamps_both_timestamps() {
        let mut d = doc();
        let now = Utc::now();
        d.soft_delete(now).unwrap();

        assert!(d.is_deleted());
        assert_eq!(d.deleted_at, Some(now));
        assert_eq!(d.updated_at, now);
    }

    #[test]
    fn test_soft_delete_twice_fails() {
        let mut d = doc();
        d.soft_delete(Utc::now()).unwrap();

        let err = d.soft_delete(Utc::now()).unwrap_err();
        assert_eq!(err, LifecycleError::AlreadyDeleted("Doc"));
        assert_eq!(err.to_string(), "Doc already deleted");
    }

    #[test]
    fn test_restore_active_fails() {
        let mut d = doc();
        let err = d.restore(Utc::now()).unwrap_err();
        assert_eq!(err, LifecycleError::NotDeleted("Doc"));
    }

    #[test]
    fn test_round_trip_only_changes_updated_at() {
        let original = doc();
        let mut d = original.clone();

        d.soft_delete(Utc::now()).unwrap();
        d.restore(Utc::now()).unwrap();

        assert_eq!(d.body, original.body);
        assert_eq!(d.deleted_at, None);
        assert!(d.updated_at > original.updated_at);
    }
}
