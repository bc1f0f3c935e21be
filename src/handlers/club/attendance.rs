// handlers/club/attendance.rs - attendance taking and statistics

use axum::{extract::State, response::Json, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::AttendanceService;
use crate::state::AppState;
use crate::types::MeetingRef;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeAttendanceReq {
    pub club_id: String,
    pub meeting_id: String,
    pub code: String,
}

/// POST /api/club/attendance/take - record the caller as present
pub async fn take_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<TakeAttendanceReq>,
) -> Result<Json<Value>, ApiError> {
    AttendanceService::new(state.firestore.clone())
        .take(&user, &req.club_id, &req.meeting_id, &req.code)
        .await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct QueryAttendanceReq {
    pub meetings: Vec<MeetingRef>,
}

/// POST /api/club/attendance/query - which of these meetings was the caller
/// present at
pub async fn query_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<QueryAttendanceReq>,
) -> Result<Json<Value>, ApiError> {
    let present_meetings = AttendanceService::new(state.firestore.clone())
        .query(&user, &req.meetings)
        .await?;
    Ok(Json(json!({ "presentMeetings": present_meetings })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStatsReq {
    pub club_id: String,
    #[serde(default)]
    pub member_email: Option<String>,
}

/// POST /api/club/attendance/member-statistics - attendance counts for one
/// member
pub async fn member_statistics_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<MemberStatsReq>,
) -> Result<Json<Value>, ApiError> {
    let stats = AttendanceService::new(state.firestore.clone())
        .member_statistics(&user, &req.club_id, req.member_email.as_deref())
        .await?;
    Ok(Json(json!({
        "total": stats.total,
        "attended": stats.attended
    })))
}
