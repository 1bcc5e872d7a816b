use auditmark_core::{
    Account, BadgeError, BadgeId, BadgeResult, CapabilityId, DelegationScope, EventHash, Level,
    MetadataUri, OwnershipLedger, ReportFingerprint, Role, RoleRegistry, Timestamp,
    TransferGuard,
};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::events::{BadgeEventKind, EventChain, EventEntry};
use crate::lockout::{Permit, SoulboundGuard};
use crate::status;
use crate::store::RecordStore;
use crate::types::{BadgeRecord, BadgeStatus, EngineConfig, RevocationInfo};

struct EngineState {
    store: RecordStore,
    events: EventChain,
}

/// The credential lifecycle engine.
///
/// Owns the history tier (records, consumed fingerprints, identifier
/// counter, event chain) and consults the injected ledger for liveness and
/// the injected registry for roles. Every public operation runs under one
/// state lock: checks, the ledger call, and the history commit happen
/// without interleaving, and any error leaves both tiers as they were.
pub struct BadgeEngine {
    state: Mutex<EngineState>,
    ledger: Arc<dyn OwnershipLedger>,
    roles: Arc<dyn RoleRegistry>,
    guard: Arc<SoulboundGuard>,
    config: EngineConfig,
}

impl BadgeEngine {
    /// Build an engine and register its soulbound guard with the ledger.
    ///
    /// Fails with `Configuration` if the ledger already has a guard.
    pub fn new(
        ledger: Arc<dyn OwnershipLedger>,
        roles: Arc<dyn RoleRegistry>,
        config: EngineConfig,
    ) -> BadgeResult<Self> {
        let guard = Arc::new(SoulboundGuard::new());
        ledger.register_guard(guard.clone())?;
        tracing::info!(
            require_admin_reason = config.require_admin_reason,
            "badge engine initialized"
        );
        Ok(Self {
            state: Mutex::new(EngineState {
                store: RecordStore::new(),
                events: EventChain::new(),
            }),
            ledger,
            roles,
            guard,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn lock_state(&self) -> BadgeResult<MutexGuard<'_, EngineState>> {
        self.state
            .lock()
            .map_err(|e| BadgeError::Storage(format!("engine lock poisoned: {}", e)))
    }

    fn require_role(&self, caller: &Account, role: Role) -> BadgeResult<()> {
        if self.roles.has_role(caller, role)? {
            Ok(())
        } else {
            Err(BadgeError::Unauthorized(format!(
                "{} lacks the {} role",
                caller, role
            )))
        }
    }

    fn live_holder(&self, id: BadgeId) -> BadgeResult<Account> {
        self.ledger
            .current_owner(id)?
            .ok_or(BadgeError::NotActive(id))
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Issue a new badge to `holder`. Issuer-only.
    ///
    /// Checks run in order: caller role, holder, metadata, fingerprint
    /// uniqueness. Returns the new identifier, which equals the number of
    /// badges issued before it.
    pub fn mint_credential(
        &self,
        caller: &Account,
        holder: &Account,
        level: Level,
        fingerprint: ReportFingerprint,
        uri: &str,
    ) -> BadgeResult<BadgeId> {
        tracing::debug!(caller = %caller, holder = %holder, level = %level, "mint requested");
        self.mint_inner(caller, holder, level, fingerprint, uri)
            .inspect_err(|e| {
                tracing::warn!(caller = %caller, code = e.code(), error = %e, "mint rejected");
            })
    }

    fn mint_inner(
        &self,
        caller: &Account,
        holder: &Account,
        level: Level,
        fingerprint: ReportFingerprint,
        uri: &str,
    ) -> BadgeResult<BadgeId> {
        let mut state = self.lock_state()?;

        self.require_role(caller, Role::Issuer)?;
        if holder.is_null() {
            return Err(BadgeError::InvalidHolder);
        }
        if fingerprint.is_zero() {
            return Err(BadgeError::InvalidMetadata(
                "fingerprint must not be zero".into(),
            ));
        }
        let location_uri = MetadataUri::new(uri)?;
        if state.store.is_fingerprint_used(&fingerprint) {
            return Err(BadgeError::DuplicateFingerprint(fingerprint));
        }

        let id = state.store.next_id();
        let record = BadgeRecord::new(
            id,
            level,
            fingerprint,
            location_uri,
            *caller,
            Timestamp::now(),
        );

        // Last fallible step; nothing has been written before it.
        self.guard.with_permit(
            Permit::Create {
                id,
                holder: *holder,
            },
            || self.ledger.assign_owner(id, holder),
        )?;

        state.store.insert(record);
        state.events.append(BadgeEventKind::Minted {
            id,
            holder: *holder,
            issuer: *caller,
            level,
            fingerprint,
        });
        state.events.append(BadgeEventKind::Locked { id });

        tracing::info!(badge = %id, holder = %holder, level = %level, "badge minted");
        Ok(id)
    }

    /// Revoke a badge on behalf of its current holder.
    pub fn self_revoke(&self, caller: &Account, id: BadgeId) -> BadgeResult<()> {
        tracing::debug!(caller = %caller, badge = %id, "self-revoke requested");
        self.self_revoke_inner(caller, id).inspect_err(|e| {
            tracing::warn!(caller = %caller, badge = %id, code = e.code(), error = %e, "self-revoke rejected");
        })
    }

    fn self_revoke_inner(&self, caller: &Account, id: BadgeId) -> BadgeResult<()> {
        let mut state = self.lock_state()?;

        let holder = self.live_holder(id)?;
        if holder != *caller {
            return Err(BadgeError::Unauthorized(format!(
                "{} does not hold badge {}",
                caller, id
            )));
        }
        let current = state
            .store
            .get(id)
            .map(BadgeRecord::status)
            .ok_or(BadgeError::UnknownIdentifier(id))?;
        let (_, info) = status::revoke_by_holder(id, current, holder)?;

        self.guard
            .with_permit(Permit::Destroy { id, holder }, || self.ledger.clear_owner(id))?;

        Self::commit_revocation(&mut state, id, info)?;
        state
            .events
            .append(BadgeEventKind::SelfRevoked { id, holder });

        tracing::info!(badge = %id, holder = %holder, "badge self-revoked");
        Ok(())
    }

    /// Revoke a badge as an administrator, independent of the holder.
    pub fn admin_revoke(
        &self,
        caller: &Account,
        id: BadgeId,
        reason: Option<&str>,
    ) -> BadgeResult<()> {
        tracing::debug!(caller = %caller, badge = %id, "admin revoke requested");
        self.admin_revoke_inner(caller, id, reason).inspect_err(|e| {
            tracing::warn!(caller = %caller, badge = %id, code = e.code(), error = %e, "admin revoke rejected");
        })
    }

    fn admin_revoke_inner(
        &self,
        caller: &Account,
        id: BadgeId,
        reason: Option<&str>,
    ) -> BadgeResult<()> {
        let mut state = self.lock_state()?;

        self.require_role(caller, Role::Administrator)?;
        let reason = self.normalize_reason(reason)?;

        let holder = self.live_holder(id)?;
        let current = state
            .store
            .get(id)
            .map(BadgeRecord::status)
            .ok_or(BadgeError::UnknownIdentifier(id))?;
        let (_, info) = status::revoke_by_administrator(id, current, *caller, reason.clone())?;

        self.guard
            .with_permit(Permit::Destroy { id, holder }, || self.ledger.clear_owner(id))?;

        Self::commit_revocation(&mut state, id, info)?;
        state.events.append(BadgeEventKind::AdminRevoked {
            id,
            admin: *caller,
            holder,
            reason,
        });

        tracing::info!(badge = %id, admin = %caller, holder = %holder, "badge revoked by administrator");
        Ok(())
    }

    fn normalize_reason(&self, reason: Option<&str>) -> BadgeResult<Option<String>> {
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        match reason {
            None if self.config.require_admin_reason => Err(BadgeError::InvalidMetadata(
                "administrative revocation requires a reason".into(),
            )),
            Some(r) if r.len() > self.config.max_reason_len => {
                Err(BadgeError::InvalidMetadata(format!(
                    "reason is {} bytes, limit is {}",
                    r.len(),
                    self.config.max_reason_len
                )))
            }
            other => Ok(other.map(str::to_string)),
        }
    }

    fn commit_revocation(
        state: &mut EngineState,
        id: BadgeId,
        info: RevocationInfo,
    ) -> BadgeResult<()> {
        state
            .store
            .get_mut(id)
            .ok_or(BadgeError::UnknownIdentifier(id))?
            .apply_revocation(info)
    }

    // -----------------------------------------------------------------------
    // Locked-out token operations
    // -----------------------------------------------------------------------

    /// Holder-to-holder moves are never permitted.
    pub fn transfer_from(
        &self,
        caller: &Account,
        from: &Account,
        to: &Account,
        id: BadgeId,
    ) -> BadgeResult<()> {
        let _state = self.lock_state()?;
        self.guard
            .check_transition(id, Some(from), Some(to))
            .and_then(|()| self.ledger.transfer(caller, from, to, id))
            .inspect_err(|e| {
                tracing::warn!(caller = %caller, badge = %id, code = e.code(), "transfer rejected");
            })
    }

    pub fn approve(&self, caller: &Account, spender: &Account, id: BadgeId) -> BadgeResult<()> {
        let _state = self.lock_state()?;
        self.guard
            .check_delegation(caller, spender, DelegationScope::Single(id))
            .and_then(|()| self.ledger.approve(caller, spender, id))
            .inspect_err(|e| {
                tracing::warn!(caller = %caller, badge = %id, code = e.code(), "approval rejected");
            })
    }

    pub fn set_approval_for_all(
        &self,
        caller: &Account,
        operator: &Account,
        approved: bool,
    ) -> BadgeResult<()> {
        let _state = self.lock_state()?;
        let scope = DelegationScope::AllOf {
            owner: *caller,
            approved,
        };
        self.guard
            .check_delegation(caller, operator, scope)
            .and_then(|()| self.ledger.set_approval_for_all(caller, operator, approved))
            .inspect_err(|e| {
                tracing::warn!(caller = %caller, code = e.code(), "operator approval rejected");
            })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Historical lookup; succeeds for revoked badges.
    pub fn get(&self, id: BadgeId) -> BadgeResult<BadgeRecord> {
        let state = self.lock_state()?;
        state
            .store
            .get(id)
            .cloned()
            .ok_or(BadgeError::UnknownIdentifier(id))
    }

    /// Metadata location of a badge that still has a holder.
    pub fn resolve_metadata_uri(&self, id: BadgeId) -> BadgeResult<String> {
        let state = self.lock_state()?;
        self.live_holder(id)?;
        state
            .store
            .get(id)
            .map(|r| r.location_uri().as_str().to_string())
            .ok_or(BadgeError::UnknownIdentifier(id))
    }

    /// Always true for an issued badge.
    pub fn is_locked(&self, id: BadgeId) -> BadgeResult<bool> {
        let state = self.lock_state()?;
        if state.store.get(id).is_some() {
            Ok(true)
        } else {
            Err(BadgeError::UnknownIdentifier(id))
        }
    }

    pub fn supports_capability(&self, capability: CapabilityId) -> bool {
        capability == CapabilityId::SOULBOUND
            || self.ledger.supports_capability(capability)
            || self.roles.supports_capability(capability)
    }

    pub fn status(&self, id: BadgeId) -> BadgeResult<BadgeStatus> {
        let state = self.lock_state()?;
        state
            .store
            .get(id)
            .map(BadgeRecord::status)
            .ok_or(BadgeError::UnknownIdentifier(id))
    }

    /// Current holder from the liveness tier; `None` once revoked.
    pub fn holder_of(&self, id: BadgeId) -> BadgeResult<Option<Account>> {
        let state = self.lock_state()?;
        if state.store.get(id).is_none() {
            return Err(BadgeError::UnknownIdentifier(id));
        }
        self.ledger.current_owner(id)
    }

    pub fn balance_of(&self, holder: &Account) -> BadgeResult<u64> {
        let _state = self.lock_state()?;
        self.ledger.balance_of(holder)
    }

    pub fn get_approved(&self, id: BadgeId) -> BadgeResult<Option<Account>> {
        let _state = self.lock_state()?;
        self.ledger.get_approved(id)
    }

    pub fn is_approved_for_all(&self, owner: &Account, operator: &Account) -> BadgeResult<bool> {
        let _state = self.lock_state()?;
        self.ledger.is_approved_for_all(owner, operator)
    }

    /// Issued badges that have not been revoked.
    pub fn live_count(&self) -> BadgeResult<usize> {
        Ok(self.lock_state()?.store.live_count())
    }

    pub fn total_issued(&self) -> BadgeResult<u64> {
        Ok(self.lock_state()?.store.total_issued())
    }

    pub fn is_fingerprint_used(&self, fingerprint: &ReportFingerprint) -> BadgeResult<bool> {
        Ok(self.lock_state()?.store.is_fingerprint_used(fingerprint))
    }

    pub fn events(&self) -> BadgeResult<Vec<EventEntry>> {
        Ok(self.lock_state()?.events.entries().to_vec())
    }

    pub fn event_head(&self) -> BadgeResult<Option<EventHash>> {
        Ok(self.lock_state()?.events.head())
    }

    pub fn verify_events(&self) -> BadgeResult<bool> {
        Ok(self.lock_state()?.events.verify())
    }
}
