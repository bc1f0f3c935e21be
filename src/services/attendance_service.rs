//! Meeting attendance: code-gated presence recording and statistics.

use chrono::Utc;
use std::sync::Arc;

use crate::auth::{guard, OfficerPermission};
use crate::error::ApiError;
use crate::firestore::{
    paths, BatchGetResult, FieldTransform, Filter, FirestoreClient, FirestoreValue,
    StructuredQuery, Write,
};
use crate::middleware::AuthUser;
use crate::types::{AttendanceStats, MeetingRef};

pub struct AttendanceService {
    firestore: Arc<dyn FirestoreClient>,
}

impl AttendanceService {
    pub fn new(firestore: Arc<dyn FirestoreClient>) -> Self {
        Self { firestore }
    }

    /// Record the caller as present at a meeting.
    ///
    /// Preconditions, in order: club membership, code match, not already
    /// recorded. Retakes are rejected with Conflict rather than silently
    /// accepted. The presence entry and the club's attendance counter
    /// commit in one atomic batch.
    pub async fn take(
        &self,
        actor: &AuthUser,
        club_id: &str,
        meeting_id: &str,
        code: &str,
    ) -> Result<(), ApiError> {
        let school = actor.school()?;
        if !actor.claims.is_member_of(club_id) {
            return Err(ApiError::bad_request("You are not a member of this club"));
        }

        let attendance_path = paths::meeting_attendance(school, club_id, meeting_id);
        let doc = self
            .firestore
            .get(&attendance_path, None)
            .await?
            .ok_or_else(|| ApiError::not_found("Meeting not found"))?;

        // a meeting with no code set accepts nothing
        if doc.field("code").and_then(FirestoreValue::as_str) != Some(code) {
            return Err(ApiError::unauthorized("Invalid attendance code"));
        }

        let already_present = doc
            .field("membersPresent")
            .map(|members| members.contains_str(&actor.email))
            .unwrap_or(false);
        if already_present {
            return Err(ApiError::conflict("Attendance already taken"));
        }

        self.firestore
            .batch_write(vec![
                Write::transform(
                    attendance_path,
                    vec![FieldTransform::array_union(
                        "membersPresent",
                        vec![FirestoreValue::from(actor.email.as_str())],
                    )],
                ),
                Write::transform(
                    paths::club_private(school, club_id),
                    vec![FieldTransform::increment("totalAttendance", 1)],
                ),
            ])
            .await?;

        Ok(())
    }

    /// Which of the given meetings the caller was present at. Attendance
    /// documents that do not exist yet are treated as not-present.
    pub async fn query(
        &self,
        actor: &AuthUser,
        meetings: &[MeetingRef],
    ) -> Result<Vec<String>, ApiError> {
        let school = actor.school()?;
        if meetings
            .iter()
            .any(|meeting| !actor.claims.is_member_of(&meeting.club_id))
        {
            return Err(ApiError::bad_request(
                "You are not a member of one or more clubs in the request",
            ));
        }
        if meetings.is_empty() {
            return Ok(Vec::new());
        }

        let doc_paths: Vec<String> = meetings
            .iter()
            .map(|meeting| paths::meeting_attendance(school, &meeting.club_id, &meeting.id))
            .collect();
        let results = self
            .firestore
            .batch_get(&doc_paths, Some(&["membersPresent"]))
            .await?;

        let mut present = Vec::new();
        for (meeting, result) in meetings.iter().zip(results) {
            if let BatchGetResult::Found(doc) = result {
                let is_present = doc
                    .field("membersPresent")
                    .map(|members| members.contains_str(&actor.email))
                    .unwrap_or(false);
                if is_present {
                    present.push(meeting.id.clone());
                }
            }
        }
        Ok(present)
    }

    /// Attendance counts for one member: meetings already started vs.
    /// meetings attended. Officers holding the Meetings capability may ask
    /// about any member; everyone else only about themselves.
    ///
    /// Both counts are server-side aggregations - the documents are never
    /// fetched.
    pub async fn member_statistics(
        &self,
        actor: &AuthUser,
        club_id: &str,
        member_email: Option<&str>,
    ) -> Result<AttendanceStats, ApiError> {
        let school = actor.school()?;

        let target_email = match member_email {
            Some(email) if email != actor.email => {
                if !guard::check_officer_permission(
                    &actor.claims,
                    club_id,
                    OfficerPermission::MEETINGS,
                    true,
                ) {
                    return Err(ApiError::forbidden(
                        "Only club officers may view attendance statistics",
                    ));
                }
                email
            }
            _ => actor.email.as_str(),
        };

        let parent = paths::club(school, club_id);
        let attended = self
            .firestore
            .count(
                &parent,
                StructuredQuery::new(paths::MEETING_ATTENDANCE)
                    .filter(Filter::array_contains("membersPresent", target_email)),
                None,
            )
            .await?;
        // meetings that have already started count toward the denominator;
        // future ones do not
        let total = self
            .firestore
            .count(
                &parent,
                StructuredQuery::new(paths::MEETINGS)
                    .filter(Filter::less_than_or_equal("startTime", Utc::now())),
                None,
            )
            .await?;

        Ok(AttendanceStats { total, attended })
    }
}
