//! Scoped service-account bearer tokens for the Google REST APIs.
//!
//! Both the Firestore and Identity Toolkit clients authenticate with a
//! self-signed RS256 JWT minted from the deployment's service-account key.
//! Tokens are cached per scope until shortly before expiry. In emulator
//! mode the static `owner` token the emulators accept is returned instead.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::config::GcpConfig;

pub const FIRESTORE_SCOPE: &str = "https://firestore.googleapis.com/";
pub const IDENTITY_SCOPE: &str = "https://identitytoolkit.googleapis.com/";

const TOKEN_LIFETIME_SECS: i64 = 3600;
// Re-mint a little early so a token never expires mid-request
const EXPIRY_SLACK_SECS: i64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid service account key: {0}")]
    Key(String),
    #[error("JWT signing failed: {0}")]
    Sign(String),
}

#[derive(Debug, Serialize)]
struct ServiceAccountJwt<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

pub struct ServiceAccountTokens {
    email: String,
    key_pem: String,
    kid: String,
    use_emulator: bool,
    cache: RwLock<HashMap<String, (String, i64)>>,
}

impl ServiceAccountTokens {
    pub fn from_config(gcp: &GcpConfig) -> Self {
        Self {
            email: gcp.service_account_email.clone(),
            // the key is stored with literal "\n"s to make it easier to enter
            key_pem: gcp.service_account_key.replace("\\n", "\n"),
            kid: gcp.service_account_kid.clone(),
            use_emulator: gcp.use_emulator,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Get a bearer token accepted by the API identified by `scope`.
    pub async fn bearer(&self, scope: &str) -> Result<String, TokenError> {
        if self.use_emulator {
            return Ok("owner".to_string());
        }

        let now = Utc::now().timestamp();
        {
            let cache = self.cache.read().await;
            if let Some((token, exp)) = cache.get(scope) {
                if *exp - EXPIRY_SLACK_SECS > now {
                    return Ok(token.clone());
                }
            }
        }

        let (token, exp) = self.mint(scope)?;
        self.cache
            .write()
            .await
            .insert(scope.to_string(), (token.clone(), exp));
        Ok(token)
    }

    fn mint(&self, scope: &str) -> Result<(String, i64), TokenError> {
        let now = Utc::now();
        let exp = (now + Duration::seconds(TOKEN_LIFETIME_SECS)).timestamp();
        let claims = ServiceAccountJwt {
            iss: &self.email,
            sub: &self.email,
            aud: scope,
            iat: now.timestamp(),
            exp,
        };

        let key = EncodingKey::from_rsa_pem(self.key_pem.as_bytes())
            .map_err(|e| TokenError::Key(e.to_string()))?;
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());

        let token = encode(&header, &claims, &key).map_err(|e| TokenError::Sign(e.to_string()))?;
        Ok((token, exp))
    }
}
