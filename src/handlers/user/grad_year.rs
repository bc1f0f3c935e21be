// handlers/user/grad_year.rs - graduation year

use axum::{extract::State, response::Json, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::ClaimsUpdate;
use crate::error::ApiError;
use crate::identity::IdentityClient;
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetGradYearReq {
    pub grad_year: String,
}

/// POST /api/user/grad-year - set the caller's graduation year via a
/// claims merge
pub async fn grad_year_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SetGradYearReq>,
) -> Result<Json<Value>, ApiError> {
    let update = ClaimsUpdate {
        grad_year: Some(json!(req.grad_year)),
        ..ClaimsUpdate::default()
    };
    state
        .identity
        .update_claims(&user.user_id, &user.claims, &update)
        .await?;
    Ok(Json(json!({ "success": true })))
}
