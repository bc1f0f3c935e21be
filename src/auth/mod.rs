//! User claims: the authorization record carried on every identity account.
//!
//! Claims are the system of record for who belongs to which school, their
//! school-level role, and their per-club memberships and officer
//! capabilities. They live on the identity provider as a JSON string in the
//! account's custom attributes; this module owns the typed view and the
//! codec, so the rest of the crate never touches the serialized blob.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub mod guard;
pub mod permissions;

pub use permissions::OfficerPermission;

/// School-level role. At most one owner per school.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Regular member, stored as the empty string
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "owner")]
    Owner,
}

impl Role {
    /// School admins and the owner bypass per-club capability checks.
    pub fn is_school_admin(self) -> bool {
        matches!(self, Role::Admin | Role::Owner)
    }
}

/// Typed view of an account's custom-claims blob.
///
/// `grad_year` and `interests` are profile fields the backend stores but
/// never inspects; they are kept as raw JSON so whatever the client wrote
/// round-trips untouched through every merge update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(default)]
    pub role: Role,
    /// Club ids this user belongs to. Ordered, no duplicates.
    #[serde(default)]
    pub member_of: Vec<String>,
    /// Club id -> capability bitmask for clubs this user is an officer of.
    #[serde(default)]
    pub officer_of: HashMap<String, OfficerPermission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grad_year: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests: Option<Value>,
}

impl UserClaims {
    pub fn is_member_of(&self, club_id: &str) -> bool {
        self.member_of.iter().any(|c| c == club_id)
    }

    pub fn officer_permissions(&self, club_id: &str) -> Option<OfficerPermission> {
        self.officer_of.get(club_id).copied()
    }

    /// Decode the identity provider's `customAttributes` string. Accounts
    /// that have never had claims set carry an empty string.
    pub fn from_attributes_json(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
    }

    /// Encode for storage in `customAttributes`.
    pub fn to_attributes_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Merge patch over [`UserClaims`].
///
/// Fields set here replace the prior value; everything else is preserved
/// from the claims object being patched. Updates to the identity provider
/// must always write the full merged object - writing only the changed
/// fields would silently delete the rest.
#[derive(Debug, Clone, Default)]
pub struct ClaimsUpdate {
    pub school: Option<String>,
    pub role: Option<Role>,
    pub member_of: Option<Vec<String>>,
    pub officer_of: Option<HashMap<String, OfficerPermission>>,
    pub grad_year: Option<Value>,
    pub interests: Option<Value>,
}

impl ClaimsUpdate {
    pub fn school(id: impl Into<String>) -> Self {
        Self {
            school: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn role(role: Role) -> Self {
        Self {
            role: Some(role),
            ..Self::default()
        }
    }

    pub fn member_of(clubs: Vec<String>) -> Self {
        Self {
            member_of: Some(clubs),
            ..Self::default()
        }
    }

    pub fn officer_of(entries: HashMap<String, OfficerPermission>) -> Self {
        Self {
            officer_of: Some(entries),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_officer_of(mut self, entries: HashMap<String, OfficerPermission>) -> Self {
        self.officer_of = Some(entries);
        self
    }

    /// Apply this patch to `base`, producing the full post-merge claims.
    pub fn merged(&self, base: &UserClaims) -> UserClaims {
        let mut claims = base.clone();
        if let Some(school) = &self.school {
            claims.school = Some(school.clone());
        }
        if let Some(role) = self.role {
            claims.role = role;
        }
        if let Some(member_of) = &self.member_of {
            claims.member_of = member_of.clone();
        }
        if let Some(officer_of) = &self.officer_of {
            claims.officer_of = officer_of.clone();
        }
        if let Some(grad_year) = &self.grad_year {
            claims.grad_year = Some(grad_year.clone());
        }
        if let Some(interests) = &self.interests {
            claims.interests = Some(interests.clone());
        }
        claims
    }
}
