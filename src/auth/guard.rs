//! Authorization checks run before any mutation.
//!
//! Pure functions over [`UserClaims`]; a deny must surface before the
//! coordinator issues its first write.

use crate::auth::{OfficerPermission, Role, UserClaims};
use crate::error::ApiError;

/// Decide whether `claims` may perform an operation on `club_id` requiring
/// any of the capabilities in `required`.
///
/// School admins and the owner pass unconditionally unless
/// `allow_admin_override` is false (used by checks that are strictly about
/// per-club officer status).
pub fn check_officer_permission(
    claims: &UserClaims,
    club_id: &str,
    required: OfficerPermission,
    allow_admin_override: bool,
) -> bool {
    if allow_admin_override && claims.role.is_school_admin() {
        return true;
    }
    match claims.officer_permissions(club_id) {
        Some(held) => held.allows(required),
        None => false,
    }
}

/// Capability check returning FORBIDDEN with the given message on deny.
pub fn require_officer_permission(
    claims: &UserClaims,
    club_id: &str,
    required: OfficerPermission,
    message: &str,
) -> Result<(), ApiError> {
    if check_officer_permission(claims, club_id, required, true) {
        Ok(())
    } else {
        tracing::debug!(club_id, required = ?required, "officer permission denied");
        Err(ApiError::forbidden(message))
    }
}

/// Hard role gate for school-admin lifecycle operations. No bit-level
/// granularity: only the owner passes.
pub fn require_owner(claims: &UserClaims, message: &str) -> Result<(), ApiError> {
    if claims.role == Role::Owner {
        Ok(())
    } else {
        Err(ApiError::forbidden(message))
    }
}
