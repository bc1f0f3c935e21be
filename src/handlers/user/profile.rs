// handlers/user/profile.rs - public profile lookup

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    #[serde(default)]
    pub email: Option<String>,
}

/// GET /user/profile?email= - public profile info, served from the TTL
/// cache when warm
pub async fn profile_get(
    State(state): State<AppState>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<Value>, ApiError> {
    let email = query
        .email
        .ok_or_else(|| ApiError::bad_request("must include email parameter"))?;

    let profile = state.profiles.lookup(&email).await?;
    Ok(Json(json!({
        "success": true,
        "displayName": profile.display_name,
        "photoUrl": profile.photo_url
    })))
}
