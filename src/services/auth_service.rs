//! Authentication service - accounts, sessions and principals.
//!
//! Every account lives in two systems: the identity provider and the local
//! profile store. Sign-up writes both and compensates on partial failure;
//! request authentication verifies the token and then reads the current
//! role from the profile store.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::infra::{
    CredentialVerifier, IdentityError, IdentityProvider, Session, UserRepository,
};
use common::{AppError, AppResult, OptionExt};
use domain::{
    authorize, NewUser, Policy, Principal, SoftDelete, User, UserPatch, UserResponse, UserRole,
};

pub const MSG_PROFILE_MISSING: &str = "User profile not found. Complete the registration.";
pub const MSG_ACCOUNT_DISABLED: &str = "Account disabled. Contact the administrator.";
pub const MSG_REFRESH_REJECTED: &str = "Refresh token invalid or expired";
pub const MSG_INVALID_ROLE: &str = "Invalid role. Use: user, admin";

/// Public part of a profile returned with a session
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProfileSummary {
    pub uid: String,
    pub email: String,
    pub nome: String,
    pub cognome: String,
    pub ruolo: UserRole,
}

impl From<&User> for ProfileSummary {
    fn from(user: &User) -> Self {
        Self {
            uid: user.uid.clone(),
            email: user.email.clone(),
            nome: user.nome.clone(),
            cognome: user.cognome.clone(),
            ruolo: user.ruolo,
        }
    }
}

/// Profile plus session returned by sign-up and login
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: ProfileSummary,
    pub id_token: String,
    pub refresh_token: String,
    /// ID token lifetime in seconds
    #[schema(example = "3600")]
    pub expires_in: String,
}

impl AuthSession {
    fn new(user: &User, session: Session) -> Self {
        Self {
            user: ProfileSummary::from(user),
            id_token: session.id_token,
            refresh_token: session.refresh_token,
            expires_in: session.expires_in,
        }
    }
}

/// Fresh credential pair returned by refresh
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: String,
}

impl From<Session> for SessionTokens {
    fn from(session: Session) -> Self {
        Self {
            id_token: session.id_token,
            refresh_token: session.refresh_token,
            expires_in: session.expires_in,
        }
    }
}

/// Who the caller is, as seen by the backend
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub role: UserRole,
    /// Active profile, or null when registration was never completed
    pub profile: Option<UserResponse>,
}

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create the provider account and the profile, rolling back the
    /// account when the profile cannot be written
    async fn signup(
        &self,
        email: String,
        password: String,
        nome: String,
        cognome: String,
    ) -> AppResult<AuthSession>;

    /// Authenticate and load the profile
    async fn login(&self, email: String, password: String) -> AppResult<AuthSession>;

    /// Exchange a refresh token for new credentials
    async fn refresh(&self, refresh_token: &str) -> AppResult<SessionTokens>;

    /// Create the profile of an account created elsewhere
    async fn register(&self, principal: &Principal, nome: String, cognome: String) -> AppResult<User>;

    /// Describe the caller's session
    async fn verify(&self, principal: &Principal) -> AppResult<SessionInfo>;

    /// Revoke every refresh token of the caller
    async fn logout(&self, principal: &Principal) -> AppResult<()>;

    /// Admin: set a user's role on the provider claim and the profile
    async fn set_role(&self, principal: &Principal, uid: &str, role: &str) -> AppResult<UserRole>;

    /// Verify a bearer token and resolve the caller's current role
    async fn resolve_principal(&self, token: &str) -> AppResult<Principal>;
}

/// Concrete implementation of AuthService.
pub struct AuthManager {
    users: Arc<dyn UserRepository>,
    identity: Arc<dyn IdentityProvider>,
    verifier: Arc<dyn CredentialVerifier>,
}

impl AuthManager {
    pub fn new(
        users: Arc<dyn UserRepository>,
        identity: Arc<dyn IdentityProvider>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        Self {
            users,
            identity,
            verifier,
        }
    }

    /// Delete a just-created provider account after a failed profile write.
    async fn roll_back_account(&self, uid: &str) {
        match self.identity.delete_account(uid).await {
            Ok(()) => tracing::info!(uid = %uid, "Rolled back provider account after profile failure"),
            Err(e) => tracing::warn!(uid = %uid, "Rollback of provider account failed: {}", e),
        }
    }
}

/// Provider outage or misconfiguration
pub(crate) fn provider_unavailable(err: IdentityError) -> AppError {
    AppError::internal(err.to_string())
}

#[async_trait]
impl AuthService for AuthManager {
    async fn signup(
        &self,
        email: String,
        password: String,
        nome: String,
        cognome: String,
    ) -> AppResult<AuthSession> {
        let signed_in = self
            .identity
            .create_account(&email, &password)
            .await
            .map_err(|e| match e {
                IdentityError::Rejected { .. } => AppError::validation(e.to_string()),
                IdentityError::Unavailable(_) => provider_unavailable(e),
            })?;

        let uid = signed_in.account.uid.clone();
        let profile = User::new(
            NewUser {
                uid: uid.clone(),
                email: signed_in.account.email.clone(),
                nome,
                cognome,
                ruolo: UserRole::User,
            },
            Utc::now(),
        );

        let user = match self.users.create(profile).await {
            Ok(user) => user,
            Err(e) => {
                self.roll_back_account(&uid).await;
                return Err(e);
            }
        };

        tracing::info!(uid = %user.uid, "User signed up");
        Ok(AuthSession::new(&user, signed_in.session))
    }

    async fn login(&self, email: String, password: String) -> AppResult<AuthSession> {
        let signed_in = self
            .identity
            .authenticate(&email, &password)
            .await
            .map_err(|e| match e {
                IdentityError::Rejected { .. } => AppError::unauthorized(e.to_string()),
                IdentityError::Unavailable(_) => provider_unavailable(e),
            })?;

        let user = self
            .users
            .find_by_uid_with_deleted(&signed_in.account.uid)
            .await?
            .ok_or_not_found(MSG_PROFILE_MISSING)?;

        if user.is_deleted() {
            return Err(AppError::forbidden(MSG_ACCOUNT_DISABLED));
        }

        Ok(AuthSession::new(&user, signed_in.session))
    }

    async fn refresh(&self, refresh_token: &str) -> AppResult<SessionTokens> {
        let session = self
            .identity
            .refresh_session(refresh_token)
            .await
            .map_err(|e| match e {
                IdentityError::Rejected { .. } => AppError::unauthorized(MSG_REFRESH_REJECTED),
                IdentityError::Unavailable(_) => provider_unavailable(e),
            })?;

        Ok(SessionTokens::from(session))
    }

    async fn register(&self, principal: &Principal, nome: String, cognome: String) -> AppResult<User> {
        authorize(Some(principal), Policy::AuthenticatedAny)?;

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
                    ruolo: UserRole::User,
                },
                Utc::now(),
            ))
            .await?;

        if let Err(e) = self.identity.set_role_claim(&user.uid, user.ruolo).await {
            tracing::warn!(uid = %user.uid, "Role claim not set after registration: {}", e);
        }

        tracing::info!(uid = %user.uid, "Profile registered");
        Ok(user)
    }

    async fn verify(&self, principal: &Principal) -> AppResult<SessionInfo> {
        let profile = self.users.find_by_uid(&principal.uid).await?;

        Ok(SessionInfo {
            uid: principal.uid.clone(),
            email: principal.email.clone(),
            email_verified: principal.email_verified,
            role: principal.role,
            profile: profile.map(UserResponse::from),
        })
    }

    async fn logout(&self, principal: &Principal) -> AppResult<()> {
        self.identity
            .revoke_sessions(&principal.uid)
            .await
            .map_err(provider_unavailable)?;

        tracing::info!(uid = %principal.uid, "Sessions revoked");
        Ok(())
    }

    async fn set_role(&self, principal: &Principal, uid: &str, role: &str) -> AppResult<UserRole> {
        authorize(Some(principal), Policy::AdminOnly)?;

        let role = UserRole::parse(role).ok_or_else(|| AppError::validation(MSG_INVALID_ROLE))?;

        self.identity
            .set_role_claim(uid, role)
            .await
            .map_err(|e| match e.code() {
                Some("USER_NOT_FOUND") => AppError::not_found("User not found"),
                _ => provider_unavailable(e),
            })?;

        let mut user = self
            .users
            .find_by_uid(uid)
            .await?
            .ok_or_not_found("User not found")?;
        user.apply(
            UserPatch {
                ruolo: Some(role),
                ..Default::default()
            },
            Utc::now(),
        );
        self.users.update(user).await?;

        tracing::info!(uid = %uid, role = %role, by = %principal.uid, "Role updated");
        Ok(role)
    }

    async fn resolve_principal(&self, token: &str) -> AppResult<Principal> {
        let verified = self
            .verifier
            .verify(token)
            .await
            .map_err(|e| AppError::unauthorized(e.to_string()))?;

        // Role comes from the active profile; the claim is not trusted
        let role = self
            .users
            .find_by_uid(&verified.uid)
            .await?
            .map(|user| user.ruolo)
            .unwrap_or_default();

        Ok(Principal {
            uid: verified.uid,
            email: verified.email,
            email_verified: verified.email_verified,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{
        MockCredentialVerifier, MockIdentityProvider, MockUserRepository, ProviderAccount,
        SignedIn, TokenError, VerifiedToken,
    };
    use mockall::predicate::*;

    fn signed_in(uid: &str, email: &str) -> SignedIn {
        SignedIn {
            account: ProviderAccount {
                uid: uid.to_string(),
                email: email.to_string(),
            },
            session: Session {
                id_token: "id".to_string(),
                refresh_token: "refresh".to_string(),
                expires_in: "3600".to_string(),
            },
        }
    }

    fn profile(uid: &str, role: UserRole) -> User {
        User::new(
            NewUser {
                uid: uid.to_string(),
                email: format!("{uid}@example.com"),
                nome: "Mario".to_string(),
                cognome: "Rossi".to_string(),
                ruolo: role,
            },
            Utc::now(),
        )
    }

    fn manager(
        users: MockUserRepository,
        identity: MockIdentityProvider,
        verifier: MockCredentialVerifier,
    ) -> AuthManager {
        AuthManager::new(Arc::new(users), Arc::new(identity), Arc::new(verifier))
    }

    #[tokio::test]
    async fn test_principal_role_comes_from_profile() {
        let mut verifier = MockCredentialVerifier::new();
        verifier.expect_verify().with(eq("tok")).returning(|_| {
            Ok(VerifiedToken {
                uid: "u1".to_string(),
                email: Some("u1@example.com".to_string()),
                email_verified: true,
                role_claim: Some("user".to_string()),
            })
        });

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_uid()
            .with(eq("u1"))
            .returning(|uid| Ok(Some(profile(uid, UserRole::Admin))));

        let auth = manager(users, MockIdentityProvider::new(), verifier);
        let principal = auth.resolve_principal("tok").await.unwrap();

        assert_eq!(principal.role, UserRole::Admin);
        assert!(principal.email_verified);
    }

    #[tokio::test]
    async fn test_principal_without_profile_is_user() {
        let mut verifier = MockCredentialVerifier::new();
        verifier.expect_verify().returning(|_| {
            Ok(VerifiedToken {
                uid: "u1".to_string(),
                email: None,
                email_verified: false,
                role_claim: Some("admin".to_string()),
            })
        });

        let mut users = MockUserRepository::new();
        users.expect_find_by_uid().returning(|_| Ok(None));

        let auth = manager(users, MockIdentityProvider::new(), verifier);
        let principal = auth.resolve_principal("tok").await.unwrap();

        assert_eq!(principal.role, UserRole::User);
    }

    #[tokio::test]
    async fn test_token_errors_are_unauthorized() {
        let mut verifier = MockCredentialVerifier::new();
        verifier
            .expect_verify()
            .returning(|_| Err(TokenError::Expired));

        let auth = manager(MockUserRepository::new(), MockIdentityProvider::new(), verifier);
        let err = auth.resolve_principal("tok").await.unwrap_err();

        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_eq!(err.to_string(), "Token expired, please log in again");
    }

    #[tokio::test]
    async fn test_signup_rejection_is_validation() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_create_account()
            .returning(|_, _| Err(IdentityError::rejected("EMAIL_EXISTS")));

        let auth = manager(MockUserRepository::new(), identity, MockCredentialVerifier::new());
        let err = auth
            .signup(
                "a@example.com".to_string(),
                "secret1".to_string(),
                "Mario".to_string(),
                "Rossi".to_string(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.to_string(), "Email already registered");
    }

    #[tokio::test]
    async fn test_signup_rolls_back_account_when_profile_fails() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_create_account()
            .returning(|email, _| Ok(signed_in("new-uid", email)));
        identity
            .expect_delete_account()
            .with(eq("new-uid"))
            .times(1)
            .returning(|_| Ok(()));

        let mut users = MockUserRepository::new();
        users
            .expect_create()
            .returning(|_| Err(AppError::internal("disk full")));

        let auth = manager(users, identity, MockCredentialVerifier::new());
        let err = auth
            .signup(
                "a@example.com".to_string(),
                "secret1".to_string(),
                "Mario".to_string(),
                "Rossi".to_string(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_failed_rollback_keeps_original_error() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_create_account()
            .returning(|email, _| Ok(signed_in("new-uid", email)));
        identity
            .expect_delete_account()
            .returning(|_| Err(IdentityError::unavailable("timeout")));

        let mut users = MockUserRepository::new();
        users
            .expect_create()
            .returning(|_| Err(AppError::conflict("User already exists")));

        let auth = manager(users, identity, MockCredentialVerifier::new());
        let err = auth
            .signup(
                "a@example.com".to_string(),
                "secret1".to_string(),
                "Mario".to_string(),
                "Rossi".to_string(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_deleted_profile_is_forbidden() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_authenticate()
            .returning(|email, _| Ok(signed_in("u1", email)));

        let mut users = MockUserRepository::new();
        users.expect_find_by_uid_with_deleted().returning(|uid| {
            let mut user = profile(uid, UserRole::User);
            user.soft_delete(Utc::now()).unwrap();
            Ok(Some(user))
        });

        let auth = manager(users, identity, MockCredentialVerifier::new());
        let err = auth
            .login("u1@example.com".to_string(), "secret1".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(err.to_string(), MSG_ACCOUNT_DISABLED);
    }

    #[tokio::test]
    async fn test_login_without_profile_is_not_found() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_authenticate()
            .returning(|email, _| Ok(signed_in("u1", email)));

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_uid_with_deleted()
            .returning(|_| Ok(None));

        let auth = manager(users, identity, MockCredentialVerifier::new());
        let err = auth
            .login("u1@example.com".to_string(), "secret1".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_login_rejection_is_unauthorized() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_authenticate()
            .returning(|_, _| Err(IdentityError::rejected("INVALID_LOGIN_CREDENTIALS")));

        let auth = manager(MockUserRepository::new(), identity, MockCredentialVerifier::new());
        let err = auth
            .login("u1@example.com".to_string(), "wrong".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_eq!(err.to_string(), "Invalid credentials");
    }

    #[tokio::test]
    async fn test_refresh_rejection_message() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_refresh_session()
            .returning(|_| Err(IdentityError::rejected("TOKEN_EXPIRED")));

        let auth = manager(MockUserRepository::new(), identity, MockCredentialVerifier::new());
        let err = auth.refresh("stale").await.unwrap_err();

        assert_eq!(err.to_string(), MSG_REFRESH_REJECTED);
    }

    #[tokio::test]
    async fn test_set_role_rejects_unknown_role() {
        let admin = Principal {
            uid: "root".to_string(),
            email: None,
            email_verified: true,
            role: UserRole::Admin,
        };

        let auth = manager(
            MockUserRepository::new(),
            MockIdentityProvider::new(),
            MockCredentialVerifier::new(),
        );
        let err = auth.set_role(&admin, "u1", "superuser").await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.to_string(), MSG_INVALID_ROLE);
    }

    #[tokio::test]
    async fn test_set_role_requires_admin() {
        let user = Principal {
            uid: "u1".to_string(),
            email: None,
            email_verified: true,
            role: UserRole::User,
        };

        let auth = manager(
            MockUserRepository::new(),
            MockIdentityProvider::new(),
            MockCredentialVerifier::new(),
        );
        let err = auth.set_role(&user, "u1", "admin").await.unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_set_role_writes_claim_then_profile() {
        let admin = Principal {
            uid: "root".to_string(),
            email: None,
            email_verified: true,
            role: UserRole::Admin,
        };

        let mut identity = MockIdentityProvider::new();
        identity
            .expect_set_role_claim()
            .with(eq("u1"), eq(UserRole::Admin))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_uid()
            .returning(|uid| Ok(Some(profile(uid, UserRole::User))));
        users
            .expect_update()
            .withf(|user| user.ruolo == UserRole::Admin)
            .times(1)
            .returning(Ok);

        let auth = manager(users, identity, MockCredentialVerifier::new());
        let role = auth.set_role(&admin, "u1", "admin").await.unwrap();

        assert_eq!(role, UserRole::Admin);
    }
}
