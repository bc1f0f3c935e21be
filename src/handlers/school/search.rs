// handlers/school/search.rs - school name search

use axum::{extract::State, response::Json, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::SchoolService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchReq {
    pub query: String,
}

/// POST /api/school/search - prefix search over school names
pub async fn search_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SearchReq>,
) -> Result<Json<Value>, ApiError> {
    let schools = SchoolService::new(state.firestore.clone(), state.identity.clone())
        .search(&user, &req.query)
        .await?;
    Ok(Json(json!({
        "success": true,
        "schools": schools
    })))
}
