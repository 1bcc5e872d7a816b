use auditmark_core::{BadgeId, ReportFingerprint};
use std::collections::{HashMap, HashSet};

use crate::types::BadgeRecord;

/// The history tier: every record ever minted, every fingerprint ever
/// consumed, and the next identifier to hand out.
///
/// Records are never removed and fingerprints are never released, so a
/// revoked badge's fingerprint stays consumed forever.
#[derive(Debug)]
pub struct RecordStore {
    records: HashMap<BadgeId, BadgeRecord>,
    fingerprints: HashSet<ReportFingerprint>,
    next_id: BadgeId,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            fingerprints: HashSet::new(),
            next_id: BadgeId::initial(),
        }
    }

    pub fn next_id(&self) -> BadgeId {
        self.next_id
    }

    /// Number of badges ever issued, revoked ones included.
    pub fn total_issued(&self) -> u64 {
        self.next_id.0
    }

    /// Number of issued badges not yet revoked.
    pub fn live_count(&self) -> usize {
        self.records.values().filter(|r| !r.is_revoked()).count()
    }

    pub fn is_fingerprint_used(&self, fingerprint: &ReportFingerprint) -> bool {
        self.fingerprints.contains(fingerprint)
    }

    pub fn get(&self, id: BadgeId) -> Option<&BadgeRecord> {
        self.records.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: BadgeId) -> Option<&mut BadgeRecord> {
        self.records.get_mut(&id)
    }

    /// Insert a record minted under `next_id()` and advance the counter.
    ///
    /// Callers check the fingerprint with `is_fingerprint_used` first; this
    /// method only commits.
    pub(crate) fn insert(&mut self, record: BadgeRecord) {
        debug_assert_eq!(record.id(), self.next_id);
        debug_assert!(!self.fingerprints.contains(record.fingerprint()));
        self.fingerprints.insert(*record.fingerprint());
        self.next_id = record.id().next();
        self.records.insert(record.id(), record);
    }
}
