// handlers/club/officers.rs - officer list management

use axum::{extract::State, response::Json, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::MembershipService;
use crate::state::AppState;
use crate::types::OfficerEntry;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOfficersReq {
    pub club_id: String,
    /// Desired officer map, keyed by email
    pub officers: BTreeMap<String, OfficerEntry>,
}

/// POST /api/club/officers/update - replace a club's officer list
pub async fn update_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<UpdateOfficersReq>,
) -> Result<Json<Value>, ApiError> {
    MembershipService::new(state.firestore.clone(), state.identity.clone())
        .update_officers(&user, &req.club_id, req.officers)
        .await?;
    Ok(Json(json!({ "success": true })))
}
