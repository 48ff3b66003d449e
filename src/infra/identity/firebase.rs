//! Reqwest-backed Firebase Authentication adapter.
//!
//! Public calls (sign-up, sign-in, refresh) use the web API key; admin
//! calls use a service-account access token.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{
    IdentityError, IdentityProvider, ProviderAccount, ServiceAccount, ServiceAccountAuth, Session,
    SignedIn,
};
use common::IdentityConfig;
use domain::UserRole;

// =============================================================================
// Wire types
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteAccountRequest<'a> {
    local_id: &'a str,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct UpdateAccountRequest<'a> {
    local_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_attributes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_since: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    local_id: [&'a str; 1],
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    #[serde(default)]
    valid_since: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct RoleClaim {
    role: UserRole,
}

// =============================================================================
// Adapter
// =============================================================================

/// Firebase Authentication over its REST API.
pub struct FirebaseIdentity {
    client: Client,
    api_key: String,
    project_id: String,
    identity_toolkit_url: String,
    secure_token_url: String,
    admin: Arc<ServiceAccountAuth>,
}

impl FirebaseIdentity {
    /// Build the adapter, loading the service account from disk.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be constructed or the service
    /// account file is unreadable.
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| IdentityError::unavailable(format!("cannot build HTTP client: {}", e)))?;

        let account = ServiceAccount::from_file(&config.credentials_path)?;
        let admin = ServiceAccountAuth::new(client.clone(), account)?;

        Ok(Self::with_admin(client, config, Arc::new(admin)))
    }

    pub fn with_admin(client: Client, config: &IdentityConfig, admin: Arc<ServiceAccountAuth>) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            project_id: config.project_id.clone(),
            identity_toolkit_url: config.identity_toolkit_url.trim_end_matches('/').to_string(),
            secure_token_url: config.secure_token_url.trim_end_matches('/').to_string(),
            admin,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn public_url(&self, method: &str) -> String {
        format!("{}/v1/accounts:{}", self.identity_toolkit_url, method)
    }

    fn admin_url(&self, method: &str) -> String {
        format!(
            "{}/v1/projects/{}/accounts:{}",
            self.identity_toolkit_url, self.project_id, method
        )
    }

    async fn admin_post<B: Serialize + ?Sized>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<RequestBuilder, IdentityError> {
        let token = self.admin.access_token().await?;
        Ok(self
            .client
            .post(self.admin_url(method))
            .bearer_auth(token)
            .json(body))
    }

    async fn password_flow(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<SignedIn, IdentityError> {
        let request = self
            .client
            .post(self.public_url(method))
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            });

        let response: PasswordResponse = send(request).await?;

        Ok(SignedIn {
            account: ProviderAccount {
                uid: response.local_id,
                email: if response.email.is_empty() {
                    email.to_string()
                } else {
                    response.email
                },
            },
            session: Session {
                id_token: response.id_token,
                refresh_token: response.refresh_token,
                expires_in: response.expires_in,
            },
        })
    }

    /// Seconds-since-epoch before which the account's tokens are revoked.
    pub async fn valid_since(&self, uid: &str) -> Result<Option<i64>, IdentityError> {
        let request = self
            .admin_post("lookup", &LookupRequest { local_id: [uid] })
            .await?;
        let response: LookupResponse = send(request).await?;

        let account = response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| IdentityError::rejected("USER_NOT_FOUND"))?;

        Ok(account.valid_since.and_then(|s| s.parse().ok()))
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn create_account(&self, email: &str, password: &str) -> Result<SignedIn, IdentityError> {
        self.password_flow("signUp", email, password).await
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<SignedIn, IdentityError> {
        self.password_flow("signInWithPassword", email, password).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        let request = self
            .client
            .post(format!("{}/v1/token", self.secure_token_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&RefreshRequest {
                grant_type: "refresh_token",
                refresh_token,
            });

        let response: RefreshResponse = send(request).await?;

        Ok(Session {
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            expires_in: response.expires_in,
        })
    }

    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError> {
        let request = self
            .admin_post("delete", &DeleteAccountRequest { local_id: uid })
            .await?;
        let _: serde_json::Value = send(request).await?;
        Ok(())
    }

    async fn set_role_claim(&self, uid: &str, role: UserRole) -> Result<(), IdentityError> {
        let claims = serde_json::to_string(&RoleClaim { role })
            .map_err(|e| IdentityError::unavailable(e.to_string()))?;

        let request = self
            .admin_post(
                "update",
                &UpdateAccountRequest {
                    local_id: uid,
                    custom_attributes: Some(claims),
                    ..Default::default()
                },
            )
            .await?;
        let _: serde_json::Value = send(request).await?;
        Ok(())
    }

    async fn revoke_sessions(&self, uid: &str) -> Result<(), IdentityError> {
        let request = self
            .admin_post(
                "update",
                &UpdateAccountRequest {
                    local_id: uid,
                    valid_since: Some(Utc::now().timestamp().to_string()),
                    ..Default::default()
                },
            )
            .await?;
        let _: serde_json::Value = send(request).await?;
        Ok(())
    }
}

// =============================================================================
// Transport helpers
// =============================================================================

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, IdentityError> {
    let response = request.send().await.map_err(map_transport_error)?;
    let status = response.status();
    let body = response.bytes().await.map_err(map_transport_error)?;

    if !status.is_success() {
        return Err(map_status_error(status, body.as_ref()));
    }

    serde_json::from_slice(&body)
        .map_err(|e| IdentityError::unavailable(format!("invalid provider response: {}", e)))
}

fn map_transport_error(error: reqwest::Error) -> IdentityError {
    if error.is_timeout() {
        IdentityError::unavailable(format!("request timed out: {}", error))
    } else {
        IdentityError::unavailable(error.to_string())
    }
}

/// Client errors carrying a provider code become `Rejected`.
fn map_status_error(status: StatusCode, body: &[u8]) -> IdentityError {
    if status.is_client_error() {
        if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body) {
            if !envelope.error.message.is_empty() {
                return IdentityError::rejected(envelope.error.message);
            }
        }
    }

    IdentityError::unavailable(format!("status {}: {}", status.as_u16(), body_preview(body)))
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    compact.chars().take(PREVIEW_CHAR_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_code_is_extracted() {
        let body = br#"{"error":{"code":400,"message":"EMAIL_EXISTS","errors":[]}}"#;
        let err = map_status_error(StatusCode::BAD_REQUEST, body);
        assert_eq!(err, IdentityError::rejected("EMAIL_EXISTS"));
        assert_eq!(err.to_string(), "Email already registered");
    }

    #[test]
    fn test_server_errors_are_unavailable() {
        let err = map_status_error(StatusCode::BAD_GATEWAY, b"upstream   down");
        assert_eq!(err, IdentityError::unavailable("status 502: upstream down"));
    }

    #[test]
    fn test_client_error_without_envelope_is_unavailable() {
        let err = map_status_error(StatusCode::NOT_FOUND, b"<html>nope</html>");
        assert!(matches!(err, IdentityError::Unavailable(_)));
    }

    #[test]
    fn test_role_claim_serialization() {
        let claims = serde_json::to_string(&RoleClaim {
            role: UserRole::Admin,
        })
        .unwrap();
        assert_eq!(claims, r#"{"role":"admin"}"#);
    }

    #[test]
    fn test_update_request_skips_unset_fields() {
        let body = serde_json::to_value(UpdateAccountRequest {
            local_id: "u1",
            valid_since: Some("1700000000".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"localId": "u1", "validSince": "1700000000"})
        );
    }
}
