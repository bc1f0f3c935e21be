// handlers/school/create.rs - school registration

use axum::{extract::State, response::Json, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::SchoolService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchoolReq {
    pub name: String,
    #[serde(default)]
    pub domain_restriction: Option<Vec<String>>,
    pub website: String,
}

/// POST /api/school/create - register a school, caller becomes owner
pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateSchoolReq>,
) -> Result<Json<Value>, ApiError> {
    let school_id = SchoolService::new(state.firestore.clone(), state.identity.clone())
        .create(&user, &req.name, req.domain_restriction, &req.website)
        .await?;
    Ok(Json(json!({
        "success": true,
        "schoolId": school_id
    })))
}
