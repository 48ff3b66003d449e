//! In-memory identity provider for integration tests.
//!
//! Issues opaque tokens of the form `id:<uid>:<n>` and verifies them against
//! its own session table, so the full request path can run without network.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    CredentialVerifier, IdentityError, IdentityProvider, ProviderAccount, Session, SignedIn,
    TokenError, VerifiedToken,
};
use domain::UserRole;

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    email: String,
    password: String,
    role_claim: Option<UserRole>,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    /// id token -> uid
    id_tokens: HashMap<String, String>,
    /// refresh token -> uid
    refresh_tokens: HashMap<String, String>,
    issued: u64,
}

impl State {
    fn issue(&mut self, uid: &str) -> Session {
        self.issued += 1;
        let id_token = format!("id:{}:{}", uid, self.issued);
        let refresh_token = format!("refresh:{}:{}", uid, self.issued);
        self.id_tokens.insert(id_token.clone(), uid.to_string());
        self.refresh_tokens
            .insert(refresh_token.clone(), uid.to_string());

        Session {
            id_token,
            refresh_token,
            expires_in: "3600".to_string(),
        }
    }

    fn find_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts.values().find(|a| a.email == email)
    }
}

/// Identity provider and verifier backed by process memory.
#[derive(Default)]
pub struct FakeIdentity {
    state: RwLock<State>,
}

impl FakeIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an account directly and return a fresh ID token for it.
    pub async fn seed_account(&self, uid: &str, email: &str, password: &str) -> String {
        let mut state = self.state.write().await;
        state.accounts.insert(
            uid.to_string(),
            Account {
                uid: uid.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                role_claim: None,
            },
        );
        state.issue(uid).id_token
    }

    pub async fn has_account(&self, email: &str) -> bool {
        self.state.read().await.find_by_email(email).is_some()
    }

    pub async fn role_claim(&self, uid: &str) -> Option<UserRole> {
        self.state
            .read()
            .await
            .accounts
            .get(uid)
            .and_then(|a| a.role_claim)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn create_account(&self, email: &str, password: &str) -> Result<SignedIn, IdentityError> {
        let mut state = self.state.write().await;
        if state.find_by_email(email).is_some() {
            return Err(IdentityError::rejected("EMAIL_EXISTS"));
        }
        if password.len() < 6 {
            return Err(IdentityError::rejected("WEAK_PASSWORD"));
        }

        // `issued` only grows and is bumped below, so this never repeats
        let uid = format!("uid-{}", state.issued + 1);
        state.accounts.insert(
            uid.clone(),
            Account {
                uid: uid.clone(),
                email: email.to_string(),
                password: password.to_string(),
                role_claim: None,
            },
        );
        let session = state.issue(&uid);

        Ok(SignedIn {
            account: ProviderAccount {
                uid,
                email: email.to_string(),
            },
            session,
        })
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<SignedIn, IdentityError> {
        let mut state = self.state.write().await;
        let account = state
            .find_by_email(email)
            .cloned()
            .ok_or_else(|| IdentityError::rejected("INVALID_LOGIN_CREDENTIALS"))?;
        if account.password != password {
            return Err(IdentityError::rejected("INVALID_LOGIN_CREDENTIALS"));
        }

        let session = state.issue(&account.uid);
        Ok(SignedIn {
            account: ProviderAccount {
                uid: account.uid,
                email: account.email,
            },
            session,
        })
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        let mut state = self.state.write().await;
        let uid = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| IdentityError::rejected("INVALID_REFRESH_TOKEN"))?;
        Ok(state.issue(&uid))
    }

    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError> {
        let mut state = self.state.write().await;
        state
            .accounts
            .remove(uid)
            .ok_or_else(|| IdentityError::rejected("USER_NOT_FOUND"))?;
        state.id_tokens.retain(|_, owner| owner != uid);
        state.refresh_tokens.retain(|_, owner| owner != uid);
        Ok(())
    }

    async fn set_role_claim(&self, uid: &str, role: UserRole) -> Result<(), IdentityError> {
        let mut state = self.state.write().await;
        let account = state
            .accounts
            .get_mut(uid)
            .ok_or_else(|| IdentityError::rejected("USER_NOT_FOUND"))?;
        account.role_claim = Some(role);
        Ok(())
    }

    async fn revoke_sessions(&self, uid: &str) -> Result<(), IdentityError> {
        let mut state = self.state.write().await;
        if !state.accounts.contains_key(uid) {
            return Err(IdentityError::rejected("USER_NOT_FOUND"));
        }
        state.id_tokens.retain(|_, owner| owner != uid);
        state.refresh_tokens.retain(|_, owner| owner != uid);
        Ok(())
    }
}

#[async_trait]
impl CredentialVerifier for FakeIdentity {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let state = self.state.read().await;

        let Some(uid) = state.id_tokens.get(token) else {
            // Well-formed tokens no longer in the table were revoked
            return Err(if token.starts_with("id:") {
                TokenError::Revoked
            } else {
                TokenError::Invalid
            });
        };
        let account = state.accounts.get(uid).ok_or(TokenError::Invalid)?;

        Ok(VerifiedToken {
            uid: account.uid.clone(),
            email: Some(account.email.clone()),
            email_verified: false,
            role_claim: account.role_claim.map(|r| r.to_string()),
        })
    }
}
