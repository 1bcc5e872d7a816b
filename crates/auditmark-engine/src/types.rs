use auditmark_core::{
    Account, BadgeError, BadgeId, BadgeResult, Level, MetadataUri, ReportFingerprint, Timestamp,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// BadgeStatus: two-state lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeStatus {
    Active,
    Revoked,
}

impl BadgeStatus {
    /// Returns true if this is a terminal state (no outbound transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Revoked)
    }
}

impl std::fmt::Display for BadgeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Revoked => write!(f, "revoked"),
        }
    }
}

// ---------------------------------------------------------------------------
// RevocationInfo: who revoked, when, and optionally why
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevokedBy {
    /// The holder gave the badge up.
    Holder(Account),
    /// An administrator revoked it without the holder's involvement.
    Administrator(Account),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationInfo {
    pub revoked_by: RevokedBy,
    pub revoked_at: Timestamp,
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// BadgeRecord: the history tier, one per issued identifier
// ---------------------------------------------------------------------------

/// Immutable facts about an issued badge plus its revocation flag.
///
/// Fields are private: `level`, `fingerprint`, `location_uri`, `issuer` and
/// `issued_at` are fixed at mint, and the revocation fields change at most
/// once, inside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeRecord {
    id: BadgeId,
    level: Level,
    fingerprint: ReportFingerprint,
    location_uri: MetadataUri,
    issuer: Account,
    issued_at: Timestamp,
    revoked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    revocation: Option<RevocationInfo>,
}

impl BadgeRecord {
    pub(crate) fn new(
        id: BadgeId,
        level: Level,
        fingerprint: ReportFingerprint,
        location_uri: MetadataUri,
        issuer: Account,
        issued_at: Timestamp,
    ) -> Self {
        Self {
            id,
            level,
            fingerprint,
            location_uri,
            issuer,
            issued_at,
            revoked: false,
            revocation: None,
        }
    }

    pub fn id(&self) -> BadgeId {
        self.id
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn fingerprint(&self) -> &ReportFingerprint {
        &self.fingerprint
    }

    pub fn location_uri(&self) -> &MetadataUri {
        &self.location_uri
    }

    pub fn issuer(&self) -> &Account {
        &self.issuer
    }

    pub fn issued_at(&self) -> Timestamp {
        self.issued_at
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    pub fn revocation(&self) -> Option<&RevocationInfo> {
        self.revocation.as_ref()
    }

    pub fn status(&self) -> BadgeStatus {
        if self.revoked {
            BadgeStatus::Revoked
        } else {
            BadgeStatus::Active
        }
    }

    /// Flip the revoked flag. Fails without touching the record if it is
    /// already revoked.
    pub(crate) fn apply_revocation(&mut self, info: RevocationInfo) -> BadgeResult<()> {
        if self.status().is_terminal() {
            return Err(BadgeError::NotActive(self.id));
        }
        self.revoked = true;
        self.revocation = Some(info);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Policy knobs for the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Reject administrative revocations that carry no reason.
    #[serde(default)]
    pub require_admin_reason: bool,

    /// Upper bound, in bytes, on an administrative revocation reason.
    #[serde(default = "default_max_reason_len")]
    pub max_reason_len: usize,
}

fn default_max_reason_len() -> usize {
    256
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            require_admin_reason: false,
            max_reason_len: default_max_reason_len(),
        }
    }
}
