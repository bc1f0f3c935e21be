// handlers/user/interests.rs - profile interests

use axum::{extract::State, response::Json, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::ClaimsUpdate;
use crate::error::ApiError;
use crate::identity::IdentityClient;
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetInterestsReq {
    /// Topic ids
    pub interests: Vec<i64>,
}

/// POST /api/user/interests - set the caller's interest topics. A plain
/// claims merge: everything else on the claims object rides along
/// untouched.
pub async fn interests_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SetInterestsReq>,
) -> Result<Json<Value>, ApiError> {
    let update = ClaimsUpdate {
        interests: Some(json!(req.interests)),
        ..ClaimsUpdate::default()
    };
    state
        .identity
        .update_claims(&user.user_id, &user.claims, &update)
        .await?;
    Ok(Json(json!({ "success": true })))
}
