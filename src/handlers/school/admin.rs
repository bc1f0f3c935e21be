// handlers/school/admin.rs - school admin lifecycle (owner only)

use axum::{extract::State, response::Json, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::SchoolService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminModReq {
    pub admin_email: String,
}

/// POST /api/school/admin/add - promote a member to school admin
pub async fn add_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<AdminModReq>,
) -> Result<Json<Value>, ApiError> {
    SchoolService::new(state.firestore.clone(), state.identity.clone())
        .add_admin(&user, &req.admin_email)
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/school/admin/remove - demote a school admin
pub async fn remove_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<AdminModReq>,
) -> Result<Json<Value>, ApiError> {
    SchoolService::new(state.firestore.clone(), state.identity.clone())
        .remove_admin(&user, &req.admin_email)
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/school/admin/transfer-ownership - hand the school to another
/// member; the old owner becomes an admin
pub async fn transfer_ownership_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<AdminModReq>,
) -> Result<Json<Value>, ApiError> {
    SchoolService::new(state.firestore.clone(), state.identity.clone())
        .transfer_ownership(&user, &req.admin_email)
        .await?;
    Ok(Json(json!({ "success": true })))
}
