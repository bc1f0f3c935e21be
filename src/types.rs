/// Shared types used across the codebase
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::auth::OfficerPermission;
use crate::firestore::FirestoreValue;

/// How a club accepts new members. Stored as an integer on the club's
/// `signup.type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClubSignupType {
    /// Club is not public yet
    Private,
    /// Open to anyone at the school
    Open,
    /// Joining requires an application form
    ApplicationRequired,
}

impl ClubSignupType {
    pub fn from_i64(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(ClubSignupType::Private),
            1 => Some(ClubSignupType::Open),
            2 => Some(ClubSignupType::ApplicationRequired),
            _ => None,
        }
    }
}

/// One entry in a club's officer map, keyed by the officer's email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficerEntry {
    pub name: String,
    /// Display label ("President", "Treasurer"), not an authorization role
    pub role: String,
    pub permissions: OfficerPermission,
}

impl OfficerEntry {
    pub fn to_value(&self) -> FirestoreValue {
        FirestoreValue::Map(BTreeMap::from([
            ("name".to_string(), FirestoreValue::from(self.name.as_str())),
            ("role".to_string(), FirestoreValue::from(self.role.as_str())),
            (
                "permissions".to_string(),
                FirestoreValue::Integer(self.permissions.bits() as i64),
            ),
        ]))
    }
}

/// Encode a full officer map the way the club document stores it.
pub fn officers_to_value(officers: &BTreeMap<String, OfficerEntry>) -> FirestoreValue {
    FirestoreValue::Map(
        officers
            .iter()
            .map(|(email, entry)| (email.clone(), entry.to_value()))
            .collect(),
    )
}

/// Reference to one meeting of one club, as sent by attendance queries.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRef {
    pub id: String,
    pub club_id: String,
}

/// Attendance counts for one member of one club.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttendanceStats {
    /// Meetings that have already started
    pub total: i64,
    /// Meetings this member was recorded present at
    pub attended: i64,
}

/// Search result row for school lookup.
#[derive(Debug, Clone, Serialize)]
pub struct SchoolSummary {
    pub id: String,
    pub name: String,
    pub website: Option<String>,
}

/// Publicly visible slice of an identity account.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}
