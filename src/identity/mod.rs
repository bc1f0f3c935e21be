//! Client for the identity provider (Google Identity Toolkit).
//!
//! The provider is the system of record for user accounts and their custom
//! claims. This module owns the REST surface: bearer-token verification,
//! lookup by email, and claims updates. A claims update always writes the
//! FULL merged object - the provider replaces `customAttributes` wholesale,
//! so sending only the changed fields would silently delete the rest.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::{ClaimsUpdate, UserClaims};
use crate::config::GcpConfig;
use crate::gcp::{ServiceAccountTokens, IDENTITY_SCOPE};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid bearer token: {0}")]
    InvalidToken(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("identity toolkit error {code}: {message}")]
    Status { code: u16, message: String },
    #[error("claims codec error: {0}")]
    Claims(String),
    #[error("token error: {0}")]
    Token(String),
}

/// An identity account as the provider reports it.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: String,
    pub email: String,
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub claims: UserClaims,
}

#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Verify an ID token and return the account it belongs to.
    async fn verify_bearer_token(&self, token: &str) -> Result<UserRecord, IdentityError>;

    /// Look up one account by email. Unknown emails are `Ok(None)`.
    async fn lookup_by_email(&self, email: &str) -> Result<Option<UserRecord>, IdentityError>;

    /// Look up several accounts in one request; unknown emails are simply
    /// absent from the result.
    async fn lookup_by_emails(&self, emails: &[String])
        -> Result<Vec<UserRecord>, IdentityError>;

    /// Merge `update` over `prior` and persist the full result. Returns the
    /// merged claims as written.
    async fn update_claims(
        &self,
        user_id: &str,
        prior: &UserClaims,
        update: &ClaimsUpdate,
    ) -> Result<UserClaims, IdentityError>;
}

/// REST implementation over `identitytoolkit.googleapis.com` (or the
/// emulator, which serves the same API under a path prefix).
pub struct RestIdentityClient {
    http: reqwest::Client,
    tokens: Arc<ServiceAccountTokens>,
    base_url: String,
    project_id: String,
}

impl RestIdentityClient {
    pub fn new(gcp: &GcpConfig, tokens: Arc<ServiceAccountTokens>) -> Self {
        let base_url = if gcp.use_emulator {
            format!(
                "{}/identitytoolkit.googleapis.com/v1",
                gcp.identity_emulator_host.trim_end_matches('/')
            )
        } else {
            "https://identitytoolkit.googleapis.com/v1".to_string()
        };
        Self {
            http: reqwest::Client::new(),
            tokens,
            base_url,
            project_id: gcp.project_id.clone(),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/projects/{}/accounts:{}",
            self.base_url, self.project_id, method
        )
    }

    async fn post(&self, method: &str, body: Value) -> Result<(u16, Value), IdentityError> {
        let token = self
            .tokens
            .bearer(IDENTITY_SCOPE)
            .await
            .map_err(|e| IdentityError::Token(e.to_string()))?;
        let resp = self
            .http
            .post(self.endpoint(method))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body: Value = resp.json().await?;
        Ok((status, body))
    }

    async fn post_ok(&self, method: &str, body: Value) -> Result<Value, IdentityError> {
        let (status, body) = self.post(method, body).await?;
        if (200..300).contains(&status) {
            return Ok(body);
        }
        let message = body["error"]["message"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string();
        Err(IdentityError::Status {
            code: status,
            message,
        })
    }

    fn user_from_wire(raw: &Value) -> Result<UserRecord, IdentityError> {
        let user_id = raw["localId"]
            .as_str()
            .ok_or_else(|| IdentityError::Claims("account without localId".to_string()))?
            .to_string();
        let claims =
            UserClaims::from_attributes_json(raw["customAttributes"].as_str().unwrap_or(""))
                .map_err(|e| IdentityError::Claims(e.to_string()))?;
        Ok(UserRecord {
            user_id,
            email: raw["email"].as_str().unwrap_or_default().to_string(),
            email_verified: raw["emailVerified"].as_bool().unwrap_or(false),
            display_name: raw["displayName"].as_str().map(str::to_string),
            photo_url: raw["photoUrl"].as_str().map(str::to_string),
            claims,
        })
    }
}

#[async_trait]
impl IdentityClient for RestIdentityClient {
    async fn verify_bearer_token(&self, token: &str) -> Result<UserRecord, IdentityError> {
        // the provider verifies signature, expiry and audience; a bad token
        // comes back as a 4xx
        let (status, body) = self.post("lookup", json!({ "idToken": token })).await?;
        if !(200..300).contains(&status) {
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("invalid token")
                .to_string();
            if (400..500).contains(&status) {
                return Err(IdentityError::InvalidToken(message));
            }
            return Err(IdentityError::Status {
                code: status,
                message,
            });
        }
        let user = body["users"]
            .as_array()
            .and_then(|users| users.first())
            .ok_or_else(|| IdentityError::InvalidToken("unknown account".to_string()))?;
        Self::user_from_wire(user)
    }

    async fn lookup_by_email(&self, email: &str) -> Result<Option<UserRecord>, IdentityError> {
        let mut users = self.lookup_by_emails(&[email.to_string()]).await?;
        Ok(if users.is_empty() {
            None
        } else {
            Some(users.remove(0))
        })
    }

    async fn lookup_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<UserRecord>, IdentityError> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }
        let body = self.post_ok("lookup", json!({ "email": emails })).await?;
        body["users"]
            .as_array()
            .map(|users| users.iter().map(Self::user_from_wire).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn update_claims(
        &self,
        user_id: &str,
        prior: &UserClaims,
        update: &ClaimsUpdate,
    ) -> Result<UserClaims, IdentityError> {
        let merged = update.merged(prior);
        let blob = merged
            .to_attributes_json()
            .map_err(|e| IdentityError::Claims(e.to_string()))?;
        self.post_ok(
            "update",
            json!({ "localId": user_id, "customAttributes": blob }),
        )
        .await?;
        Ok(merged)
    }
}
