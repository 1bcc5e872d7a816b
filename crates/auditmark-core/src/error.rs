use thiserror::Error;

use crate::types::{BadgeId, ReportFingerprint};

/// Caller-visible rejection taxonomy for every badge operation.
///
/// Every variant is a hard failure: the operation that produced it left no
/// state behind. Callers recover only by fixing the argument or the
/// authorization and resubmitting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BadgeError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid holder: the null account cannot hold a badge")]
    InvalidHolder,

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("duplicate fingerprint: {0} was already used by an earlier badge")]
    DuplicateFingerprint(ReportFingerprint),

    #[error("unknown identifier: badge {0} was never issued")]
    UnknownIdentifier(BadgeId),

    #[error("not active: badge {0} has no current holder")]
    NotActive(BadgeId),

    #[error("non-transferable: badge {0} is soulbound")]
    NonTransferable(BadgeId),

    #[error("approvals are disabled for soulbound badges")]
    ApprovalsDisabled,

    #[error("identifier {0} already has a holder")]
    AlreadyAssigned(BadgeId),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl BadgeError {
    /// Stable machine-readable tag for the variant.
    pub fn code(&self) -> &'static str {
        match self {
            BadgeError::Unauthorized(_) => "unauthorized",
            BadgeError::InvalidHolder => "invalid_holder",
            BadgeError::InvalidMetadata(_) => "invalid_metadata",
            BadgeError::DuplicateFingerprint(_) => "duplicate_fingerprint",
            BadgeError::UnknownIdentifier(_) => "unknown_identifier",
            BadgeError::NotActive(_) => "not_active",
            BadgeError::NonTransferable(_) => "non_transferable",
            BadgeError::ApprovalsDisabled => "approvals_disabled",
            BadgeError::AlreadyAssigned(_) => "already_assigned",
            BadgeError::Configuration(_) => "configuration",
            BadgeError::Storage(_) => "storage",
        }
    }
}

pub type BadgeResult<T> = Result<T, BadgeError>;
