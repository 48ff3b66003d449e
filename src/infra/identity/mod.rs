//! Identity provider integration.
//!
//! Two collaborator seams: [`IdentityProvider`] creates, authenticates and
//! administers provider accounts, while [`CredentialVerifier`] turns a bearer
//! token into a verified identity. Firebase implements both over REST.

mod firebase;
mod service_account;
mod token_verifier;

#[cfg(any(test, feature = "test-utils"))]
mod fake;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use domain::UserRole;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

pub use firebase::FirebaseIdentity;
pub use service_account::{ServiceAccount, ServiceAccountAuth};
pub use token_verifier::FirebaseTokenVerifier;

#[cfg(any(test, feature = "test-utils"))]
pub use fake::FakeIdentity;

/// Provider account as returned by sign-up and sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAccount {
    pub uid: String,
    pub email: String,
}

/// Session credential pair issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id_token: String,
    pub refresh_token: String,
    /// Lifetime of the ID token in seconds, as the provider reports it
    pub expires_in: String,
}

/// Result of a successful sign-up or sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIn {
    pub account: ProviderAccount,
    pub session: Session,
}

/// Identity extracted from a verified ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    /// `role` custom claim, if any. Informational only.
    pub role_claim: Option<String>,
}

/// Why a bearer token was refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token expired, please log in again")]
    Expired,

    #[error("Token revoked, please log in again")]
    Revoked,

    #[error("Invalid token")]
    Invalid,
}

/// Failure talking to the identity provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The provider refused the request with an error code
    #[error("{}", provider_message(.code))]
    Rejected { code: String },

    /// Transport, decoding or credential failure
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

impl IdentityError {
    pub fn rejected(code: impl Into<String>) -> Self {
        IdentityError::Rejected { code: code.into() }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        IdentityError::Unavailable(msg.into())
    }

    /// Provider error code without its trailing detail
    pub fn code(&self) -> Option<&str> {
        match self {
            IdentityError::Rejected { code } => Some(base_code(code)),
            IdentityError::Unavailable(_) => None,
        }
    }
}

/// Strip details such as `WEAK_PASSWORD : Password should be at least 6 characters`.
fn base_code(code: &str) -> &str {
    code.split(" : ").next().unwrap_or(code).trim()
}

/// User-facing message for a provider error code.
pub fn provider_message(code: &str) -> &'static str {
    match base_code(code) {
        "EMAIL_EXISTS" => "Email already registered",
        "INVALID_EMAIL" => "Invalid email",
        "WEAK_PASSWORD" => "Password too weak (minimum 6 characters)",
        "EMAIL_NOT_FOUND" => "Email not registered",
        "INVALID_PASSWORD" => "Incorrect password",
        "INVALID_LOGIN_CREDENTIALS" => "Invalid credentials",
        "USER_DISABLED" => "Account disabled",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts, try again later",
        _ => "Authentication error",
    }
}

/// Account operations of the identity provider.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an email/password account and sign it in
    async fn create_account(&self, email: &str, password: &str)
        -> Result<SignedIn, IdentityError>;

    /// Sign in with email and password
    async fn authenticate(&self, email: &str, password: &str) -> Result<SignedIn, IdentityError>;

    /// Exchange a refresh token for a new session
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, IdentityError>;

    /// Permanently delete the provider account
    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError>;

    /// Store the role as a custom claim on the account
    async fn set_role_claim(&self, uid: &str, role: UserRole) -> Result<(), IdentityError>;

    /// Invalidate every refresh token issued so far
    async fn revoke_sessions(&self, uid: &str) -> Result<(), IdentityError>;
}

/// Bearer token verification.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_map_to_messages() {
        assert_eq!(provider_message("EMAIL_EXISTS"), "Email already registered");
        assert_eq!(provider_message("INVALID_LOGIN_CREDENTIALS"), "Invalid credentials");
        assert_eq!(
            provider_message("TOO_MANY_ATTEMPTS_TRY_LATER"),
            "Too many attempts, try again later"
        );
    }

    #[test]
    fn test_code_detail_is_ignored() {
        let err = IdentityError::rejected(
            "WEAK_PASSWORD : Password should be at least 6 characters",
        );
        assert_eq!(err.code(), Some("WEAK_PASSWORD"));
        assert_eq!(err.to_string(), "Password too weak (minimum 6 characters)");
    }

    #[test]
    fn test_unknown_code_is_generic() {
        assert_eq!(provider_message("OPERATION_NOT_ALLOWED"), "Authentication error");
        assert_eq!(IdentityError::unavailable("timeout").code(), None);
    }
}
