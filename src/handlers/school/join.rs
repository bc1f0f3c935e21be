// handlers/school/join.rs - school membership

use axum::{extract::State, response::Json, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::SchoolService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinReq {
    pub school_id: String,
}

/// POST /api/school/join - join a school as a member
pub async fn join_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<JoinReq>,
) -> Result<Json<Value>, ApiError> {
    SchoolService::new(state.firestore.clone(), state.identity.clone())
        .join(&user, &req.school_id)
        .await?;
    Ok(Json(json!({ "success": true })))
}
