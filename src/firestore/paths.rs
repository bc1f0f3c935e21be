//! Document path helpers for the school/club hierarchy.
//!
//! All paths are relative to the database root; the client prepends the
//! `projects/{p}/databases/(default)/documents` resource prefix.

/// Root collection of school documents.
pub const SCHOOLS: &str = "schools";

/// Per-club subcollection of meeting attendance documents.
pub const MEETING_ATTENDANCE: &str = "meeting_attendance";

/// Per-club subcollection of scheduled meetings.
pub const MEETINGS: &str = "meetings";

pub fn school(school_id: &str) -> String {
    format!("schools/{}", school_id)
}

pub fn club(school_id: &str, club_id: &str) -> String {
    format!("schools/{}/clubs/{}", school_id, club_id)
}

/// Officer-only companion document to the public club doc.
pub fn club_private(school_id: &str, club_id: &str) -> String {
    format!("schools/{}/clubs_private/{}", school_id, club_id)
}

pub fn meeting_attendance(school_id: &str, club_id: &str, meeting_id: &str) -> String {
    format!(
        "schools/{}/clubs/{}/meeting_attendance/{}",
        school_id, club_id, meeting_id
    )
}
