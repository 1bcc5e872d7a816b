//! Two-state badge status machine.
//!
//! States: Active, Revoked
//! Terminal states: Revoked
//!
//! Valid transitions:
//!   Active -> Revoked (by the holder or by an administrator)
//!
//! Revocation is not idempotent: revoking a Revoked badge is rejected with
//! `NotActive` rather than reported as success.

use auditmark_core::{Account, BadgeError, BadgeId, BadgeResult, Timestamp};

use crate::types::{BadgeStatus, RevocationInfo, RevokedBy};

/// Check whether a status transition is valid.
pub fn is_valid_transition(from: BadgeStatus, to: BadgeStatus) -> bool {
    matches!((from, to), (BadgeStatus::Active, BadgeStatus::Revoked))
}

/// Attempt a status transition, returning the new status or an error.
pub fn transition(id: BadgeId, from: BadgeStatus, to: BadgeStatus) -> BadgeResult<BadgeStatus> {
    if is_valid_transition(from, to) {
        Ok(to)
    } else {
        Err(BadgeError::NotActive(id))
    }
}

/// Revocation requested by the current holder.
pub fn revoke_by_holder(
    id: BadgeId,
    current: BadgeStatus,
    holder: Account,
) -> BadgeResult<(BadgeStatus, RevocationInfo)> {
    let new_status = transition(id, current, BadgeStatus::Revoked)?;
    let info = RevocationInfo {
        revoked_by: RevokedBy::Holder(holder),
        revoked_at: Timestamp::now(),
        reason: None,
    };
    Ok((new_status, info))
}

/// Revocation requested by an administrator, with an optional reason.
pub fn revoke_by_administrator(
    id: BadgeId,
    current: BadgeStatus,
    admin: Account,
    reason: Option<String>,
) -> BadgeResult<(BadgeStatus, RevocationInfo)> {
    let new_status = transition(id, current, BadgeStatus::Revoked)?;
    let info = RevocationInfo {
        revoked_by: RevokedBy::Administrator(admin),
        revoked_at: Timestamp::now(),
        reason,
    };
    Ok((new_status, info))
}
