// handlers/club/members.rs - club membership endpoints

use axum::{extract::State, response::Json, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::MembershipService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRemoveMemberReq {
    pub club_id: String,
    /// Present when an officer is adding/removing another member
    #[serde(default)]
    pub member_email: Option<String>,
}

/// POST /api/club/members/add - join a club, or add a member as an officer
pub async fn add_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<AddRemoveMemberReq>,
) -> Result<Json<Value>, ApiError> {
    MembershipService::new(state.firestore.clone(), state.identity.clone())
        .add_member(&user, &req.club_id, req.member_email.as_deref())
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/club/members/remove - leave a club, or remove a member as an
/// officer
pub async fn remove_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<AddRemoveMemberReq>,
) -> Result<Json<Value>, ApiError> {
    MembershipService::new(state.firestore.clone(), state.identity.clone())
        .remove_member(&user, &req.club_id, req.member_email.as_deref())
        .await?;
    Ok(Json(json!({ "success": true })))
}
