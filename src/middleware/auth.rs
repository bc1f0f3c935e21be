use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::UserClaims;
use crate::config;
use crate::error::ApiError;
use crate::identity::{IdentityClient, UserRecord};
use crate::state::AppState;

/// Authenticated caller context extracted from the bearer token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub email_verified: bool,
    pub claims: UserClaims,
}

impl AuthUser {
    /// Everything after the `@`.
    pub fn email_domain(&self) -> Option<&str> {
        self.email.split_once('@').map(|(_, domain)| domain)
    }

    /// The caller's school, required by every club and school operation.
    pub fn school(&self) -> Result<&str, ApiError> {
        self.claims
            .school
            .as_deref()
            .ok_or_else(|| ApiError::bad_request("You must join a school first"))
    }
}

impl From<UserRecord> for AuthUser {
    fn from(record: UserRecord) -> Self {
        Self {
            user_id: record.user_id,
            email: record.email,
            email_verified: record.email_verified,
            claims: record.claims,
        }
    }
}

/// Bearer authentication middleware: verifies the ID token through the
/// identity provider and injects the caller context. Claims are re-derived
/// from the token on every request - revoked permissions take effect on the
/// very next call.
pub async fn bearer_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers).map_err(ApiError::unauthorized)?;

    let record = state.identity.verify_bearer_token(&token).await?;

    if config::config().security.require_verified_email && !record.email_verified {
        return Err(ApiError::forbidden("Email not verified"));
    }

    request.extensions_mut().insert(AuthUser::from(record));
    Ok(next.run(request).await)
}

/// Extract the token from an `Authorization: Bearer ...` header
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty bearer token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
