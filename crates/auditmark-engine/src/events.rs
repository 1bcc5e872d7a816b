use auditmark_core::{Account, BadgeId, EventHash, Level, ReportFingerprint, Timestamp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Lifecycle transitions observable by auditors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BadgeEventKind {
    Minted {
        id: BadgeId,
        holder: Account,
        issuer: Account,
        level: Level,
        fingerprint: ReportFingerprint,
    },
    /// Soulbound marker, emitted alongside every mint.
    Locked {
        id: BadgeId,
    },
    SelfRevoked {
        id: BadgeId,
        holder: Account,
    },
    AdminRevoked {
        id: BadgeId,
        admin: Account,
        holder: Account,
        reason: Option<String>,
    },
}

impl BadgeEventKind {
    pub fn badge_id(&self) -> BadgeId {
        match self {
            Self::Minted { id, .. }
            | Self::Locked { id }
            | Self::SelfRevoked { id, .. }
            | Self::AdminRevoked { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeEvent {
    pub timestamp: Timestamp,
    pub kind: BadgeEventKind,
    pub previous_hash: Option<EventHash>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEntry {
    pub event: BadgeEvent,
    pub hash: EventHash,
}

/// Hash-chained append-only lifecycle log.
///
/// Each entry commits to the hash of the previous one, so rewriting or
/// dropping any past event breaks `verify`. The chain is plain data; the
/// engine appends to it under the same lock that guards the record store,
/// so a transition and its events commit together.
#[derive(Debug, Default)]
pub struct EventChain {
    entries: Vec<EventEntry>,
}

impl EventChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn compute_hash(event: &BadgeEvent, previous: Option<&EventHash>) -> EventHash {
        let mut hasher = Sha256::new();

        if let Some(prev) = previous {
            hasher.update(prev.0);
        }

        hasher.update(event.timestamp.seconds_since_epoch.to_le_bytes());
        hasher.update(event.timestamp.nanoseconds.to_le_bytes());

        let kind_bytes = serde_json::to_vec(&event.kind).unwrap_or_default();
        hasher.update(&kind_bytes);

        let hash = hasher.finalize();
        let mut result = [0u8; 32];
        result.copy_from_slice(&hash);
        EventHash(result)
    }

    pub fn append(&mut self, kind: BadgeEventKind) -> EventHash {
        self.append_at(kind, Timestamp::now())
    }

    pub fn append_at(&mut self, kind: BadgeEventKind, timestamp: Timestamp) -> EventHash {
        let previous = self.entries.last().map(|e| e.hash);
        let event = BadgeEvent {
            timestamp,
            kind,
            previous_hash: previous,
        };
        let hash = Self::compute_hash(&event, previous.as_ref());
        tracing::debug!(hash = %hash, badge = %event.kind.badge_id(), "lifecycle event appended");
        self.entries.push(EventEntry { event, hash });
        hash
    }

    pub fn verify(&self) -> bool {
        let mut previous: Option<&EventHash> = None;
        for entry in &self.entries {
            if entry.event.previous_hash.as_ref() != previous {
                return false;
            }
            if Self::compute_hash(&entry.event, previous) != entry.hash {
                return false;
            }
            previous = Some(&entry.hash);
        }
        true
    }

    pub fn head(&self) -> Option<EventHash> {
        self.entries.last().map(|e| e.hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[EventEntry] {
        &self.entries
    }

    #[cfg(test)]
    pub(crate) fn entries_mut(&mut self) -> &mut Vec<EventEntry> {
        &mut self.entries
    }
}
