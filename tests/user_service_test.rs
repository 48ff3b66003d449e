//! User service unit tests.

use std::sync::Arc;

use chrono::Utc;
use mockall::predicate::eq;

use common::AppError;
use domain::{NewUser, Principal, User, UserPatch, UserRole};
use greenzone::infra::{IdentityError, MockIdentityProvider, MockUserRepository};
use greenzone::services::{UserManager, UserService};

fn create_test_user(uid: &str, role: UserRole) -> User {
    User::new(
        NewUser {
            uid: uid.to_string(),
            email: format!("{uid}@example.com"),
            nome: "Test".to_string(),
            cognome: "User".to_string(),
            ruolo: role,
        },
        Utc::now(),
    )
}

fn principal(uid: &str, role: UserRole) -> Principal {
    Principal {
        uid: uid.to_string(),
        email: Some(format!("{uid}@example.com")),
        email_verified: true,
        role,
    }
}

fn manager(repo: MockUserRepository, identity: MockIdentityProvider) -> UserManager {
    UserManager::new(Arc::new(repo), Arc::new(identity))
}

#[tokio::test]
async fn test_get_own_profile() {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_uid()
        .with(eq("u1"))
        .returning(|uid| Ok(Some(create_test_user(uid, UserRole::User))));

    let service = manager(repo, MockIdentityProvider::new());
    let user = service
        .get(&principal("u1", UserRole::User), "u1")
        .await
        .unwrap();

    assert_eq!(user.uid, "u1");
}

#[tokio::test]
async fn test_get_other_profile_forbidden() {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_uid().never();

    let service = manager(repo, MockIdentityProvider::new());
    let result = service.get(&principal("u1", UserRole::User), "u2").await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn test_admin_lists_with_deleted() {
    let mut repo = MockUserRepository::new();
    repo.expect_list().never();
    repo.expect_list_with_deleted().times(1).returning(|| {
        let mut gone = create_test_user("u2", UserRole::User);
        gone.deleted_at = Some(Utc::now());
        Ok(vec![create_test_user("u1", UserRole::User), gone])
    });

    let service = manager(repo, MockIdentityProvider::new());
    let users = service
        .list(&principal("root", UserRole::Admin), true)
        .await
        .unwrap();

    assert_eq!(users.len(), 2);
}

#[tokio::test]
async fn test_list_requires_admin() {
    let service = manager(MockUserRepository::new(), MockIdentityProvider::new());
    let result = service.list(&principal("u1", UserRole::User), false).await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn test_create_with_admin_role_requires_admin() {
    let mut repo = MockUserRepository::new();
    repo.expect_create().never();

    let service = manager(repo, MockIdentityProvider::new());
    let result = service
        .create(
            &principal("u1", UserRole::User),
            "Anna".to_string(),
            "Verdi".to_string(),
            Some(UserRole::Admin),
        )
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn test_create_tolerates_claim_sync_failure() {
    let mut repo = MockUserRepository::new();
    repo.expect_create().returning(Ok);

    let mut identity = MockIdentityProvider::new();
    identity
        .expect_set_role_claim()
        .with(eq("u1"), eq(UserRole::User))
        .returning(|_, _| Err(IdentityError::Unavailable("timeout".to_string())));

    let service = manager(repo, identity);
    let user = service
        .create(
            &principal("u1", UserRole::User),
            "Anna".to_string(),
            "Verdi".to_string(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(user.email, "u1@example.com");
    assert_eq!(user.ruolo, UserRole::User);
}

#[tokio::test]
async fn test_create_without_email_is_validation() {
    let service = manager(MockUserRepository::new(), MockIdentityProvider::new());
    let mut caller = principal("u1", UserRole::User);
    caller.email = None;

    let result = service
        .create(&caller, "Anna".to_string(), "Verdi".to_string(), None)
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_update_deleted_user_not_found() {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_uid().returning(|_| Ok(None));
    repo.expect_update().never();

    let service = manager(repo, MockIdentityProvider::new());
    let patch = UserPatch {
        nome: Some("Nuovo".to_string()),
        ..Default::default()
    };
    let result = service
        .update(&principal("root", UserRole::Admin), "u1", patch)
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_update_empty_patch_rejected() {
    let service = manager(MockUserRepository::new(), MockIdentityProvider::new());
    let result = service
        .update(&principal("u1", UserRole::User), "u1", UserPatch::default())
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_admin_role_change_syncs_claim() {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_uid()
        .returning(|uid| Ok(Some(create_test_user(uid, UserRole::User))));
    repo.expect_update().returning(Ok);

    let mut identity = MockIdentityProvider::new();
    identity
        .expect_set_role_claim()
        .with(eq("u1"), eq(UserRole::Admin))
        .times(1)
        .returning(|_, _| Ok(()));

    let service = manager(repo, identity);
    let patch = UserPatch {
        ruolo: Some(UserRole::Admin),
        ..Default::default()
    };
    let user = service
        .update(&principal("root", UserRole::Admin), "u1", patch)
        .await
        .unwrap();

    assert_eq!(user.ruolo, UserRole::Admin);
}

#[tokio::test]
async fn test_soft_delete_already_deleted_conflicts() {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_uid_with_deleted().returning(|uid| {
        let mut user = create_test_user(uid, UserRole::User);
        user.deleted_at = Some(Utc::now());
        Ok(Some(user))
    });
    repo.expect_set_deleted_at().never();

    let service = manager(repo, MockIdentityProvider::new());
    let result = service
        .soft_delete(&principal("u1", UserRole::User), "u1")
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_restore_active_user_conflicts() {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_uid_with_deleted()
        .returning(|uid| Ok(Some(create_test_user(uid, UserRole::User))));

    let service = manager(repo, MockIdentityProvider::new());
    let result = service
        .restore(&principal("root", UserRole::Admin), "u1")
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_hard_delete_removes_profile_and_account() {
    let mut repo = MockUserRepository::new();
    repo.expect_delete().with(eq("u1")).returning(|_| Ok(true));

    let mut identity = MockIdentityProvider::new();
    identity
        .expect_delete_account()
        .with(eq("u1"))
        .times(1)
        .returning(|_| Ok(()));

    let service = manager(repo, identity);
    service
        .hard_delete(&principal("root", UserRole::Admin), "u1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_hard_delete_missing_user_not_found() {
    let mut repo = MockUserRepository::new();
    repo.expect_delete().returning(|_| Ok(false));

    let mut identity = MockIdentityProvider::new();
    identity.expect_delete_account().never();

    let service = manager(repo, identity);
    let result = service
        .hard_delete(&principal("root", UserRole::Admin), "ghost")
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}
