use auditmark_core::{
    Account, BadgeError, BadgeId, BadgeResult, CapabilityId, DelegationScope, OwnershipLedger,
    TransferGuard,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// In-memory identifier/holder bookkeeping with standard transfer and
/// approval semantics.
///
/// With no guard registered it behaves as an ordinary transferable token
/// ledger. Once a guard is registered, every holder change and every
/// approval request is offered to the guard first.
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    guard: OnceLock<Arc<dyn TransferGuard>>,
}

#[derive(Default)]
struct LedgerState {
    owners: HashMap<BadgeId, Account>,
    balances: HashMap<Account, u64>,
    token_approvals: HashMap<BadgeId, Account>,
    operator_approvals: HashSet<(Account, Account)>,
}

fn lock_state(mutex: &Mutex<LedgerState>) -> BadgeResult<MutexGuard<'_, LedgerState>> {
    mutex
        .lock()
        .map_err(|e| BadgeError::Storage(format!("ledger lock poisoned: {}", e)))
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            guard: OnceLock::new(),
        }
    }

    fn guard_transition(
        &self,
        id: BadgeId,
        from: Option<&Account>,
        to: Option<&Account>,
    ) -> BadgeResult<()> {
        match self.guard.get() {
            Some(guard) => guard.check_transition(id, from, to).inspect_err(|e| {
                tracing::warn!(badge = %id, error = %e, "ownership change vetoed by guard");
            }),
            None => Ok(()),
        }
    }

    fn guard_delegation(
        &self,
        caller: &Account,
        delegate: &Account,
        scope: DelegationScope,
    ) -> BadgeResult<()> {
        match self.guard.get() {
            Some(guard) => guard
                .check_delegation(caller, delegate, scope)
                .inspect_err(|e| {
                    tracing::warn!(caller = %caller, error = %e, "delegation vetoed by guard");
                }),
            None => Ok(()),
        }
    }

    /// Apply a holder change that has already passed the guard.
    fn commit(state: &mut LedgerState, id: BadgeId, to: Option<Account>) -> Option<Account> {
        let previous = state.owners.remove(&id);
        state.token_approvals.remove(&id);

        if let Some(prev) = previous {
            if let Some(balance) = state.balances.get_mut(&prev) {
                *balance = balance.saturating_sub(1);
                if *balance == 0 {
                    state.balances.remove(&prev);
                }
            }
        }

        if let Some(next) = to {
            state.owners.insert(id, next);
            *state.balances.entry(next).or_insert(0) += 1;
        }

        tracing::debug!(badge = %id, from = ?previous, to = ?to, "ownership committed");
        previous
    }

    fn is_authorized(state: &LedgerState, caller: &Account, owner: &Account, id: BadgeId) -> bool {
        caller == owner
            || state.token_approvals.get(&id) == Some(caller)
            || state.operator_approvals.contains(&(*owner, *caller))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl OwnershipLedger for InMemoryLedger {
    fn register_guard(&self, guard: Arc<dyn TransferGuard>) -> BadgeResult<()> {
        self.guard
            .set(guard)
            .map_err(|_| BadgeError::Configuration("a transfer guard is already registered".into()))
    }

    fn assign_owner(&self, id: BadgeId, holder: &Account) -> BadgeResult<()> {
        if holder.is_null() {
            return Err(BadgeError::InvalidHolder);
        }
        let mut state = lock_state(&self.state)?;
        if state.owners.contains_key(&id) {
            return Err(BadgeError::AlreadyAssigned(id));
        }
        self.guard_transition(id, None, Some(holder))?;
        Self::commit(&mut state, id, Some(*holder));
        Ok(())
    }

    fn clear_owner(&self, id: BadgeId) -> BadgeResult<Account> {
        let mut state = lock_state(&self.state)?;
        let owner = state
            .owners
            .get(&id)
            .copied()
            .ok_or(BadgeError::NotActive(id))?;
        self.guard_transition(id, Some(&owner), None)?;
        Self::commit(&mut state, id, None);
        Ok(owner)
    }

    fn current_owner(&self, id: BadgeId) -> BadgeResult<Option<Account>> {
        let state = lock_state(&self.state)?;
        Ok(state.owners.get(&id).copied())
    }

    fn balance_of(&self, holder: &Account) -> BadgeResult<u64> {
        if holder.is_null() {
            return Err(BadgeError::InvalidHolder);
        }
        let state = lock_state(&self.state)?;
        Ok(state.balances.get(holder).copied().unwrap_or(0))
    }

    fn transfer(
        &self,
        caller: &Account,
        from: &Account,
        to: &Account,
        id: BadgeId,
    ) -> BadgeResult<()> {
        if to.is_null() {
            return Err(BadgeError::InvalidHolder);
        }
        let mut state = lock_state(&self.state)?;
        let owner = state.owners.get(&id).copied();

        self.guard_transition(id, owner.as_ref(), Some(to))?;

        let owner = owner.ok_or(BadgeError::NotActive(id))?;
        if !Self::is_authorized(&state, caller, &owner, id) {
            return Err(BadgeError::Unauthorized(format!(
                "{} may not move badge {}",
                caller, id
            )));
        }
        if owner != *from {
            return Err(BadgeError::Unauthorized(format!(
                "{} does not hold badge {}",
                from, id
            )));
        }
        Self::commit(&mut state, id, Some(*to));
        Ok(())
    }

    fn approve(&self, caller: &Account, spender: &Account, id: BadgeId) -> BadgeResult<()> {
        self.guard_delegation(caller, spender, DelegationScope::Single(id))?;

        let mut state = lock_state(&self.state)?;
        let owner = state
            .owners
            .get(&id)
            .copied()
            .ok_or(BadgeError::NotActive(id))?;
        if *caller != owner && !state.operator_approvals.contains(&(owner, *caller)) {
            return Err(BadgeError::Unauthorized(format!(
                "{} may not approve for badge {}",
                caller, id
            )));
        }
        if spender.is_null() {
            state.token_approvals.remove(&id);
        } else {
            state.token_approvals.insert(id, *spender);
        }
        Ok(())
    }

    fn set_approval_for_all(
        &self,
        caller: &Account,
        operator: &Account,
        approved: bool,
    ) -> BadgeResult<()> {
        self.guard_delegation(
            caller,
            operator,
            DelegationScope::AllOf {
                owner: *caller,
                approved,
            },
        )?;

        if operator.is_null() {
            return Err(BadgeError::InvalidHolder);
        }
        let mut state = lock_state(&self.state)?;
        if approved {
            state.operator_approvals.insert((*caller, *operator));
        } else {
            state.operator_approvals.remove(&(*caller, *operator));
        }
        Ok(())
    }

    fn get_approved(&self, id: BadgeId) -> BadgeResult<Option<Account>> {
        let state = lock_state(&self.state)?;
        if !state.owners.contains_key(&id) {
            return Err(BadgeError::NotActive(id));
        }
        Ok(state.token_approvals.get(&id).copied())
    }

    fn is_approved_for_all(&self, owner: &Account, operator: &Account) -> BadgeResult<bool> {
        let state = lock_state(&self.state)?;
        Ok(state.operator_approvals.contains(&(*owner, *operator)))
    }

    fn supports_capability(&self, id: CapabilityId) -> bool {
        id == CapabilityId::INTROSPECTION
            || id == CapabilityId::OWNERSHIP
            || id == CapabilityId::OWNERSHIP_METADATA
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Account = Account([0xa1; 20]);
    const BOB: Account = Account([0xb0; 20]);
    const CAROL: Account = Account([0xc0; 20]);

    /// Rejects everything except creation, to observe guard placement.
    struct CreationOnly;

    impl TransferGuard for CreationOnly {
        fn check_transition(
            &self,
            id: BadgeId,
            from: Option<&Account>,
            _to: Option<&Account>,
        ) -> BadgeResult<()> {
            match from {
                None => Ok(()),
                Some(_) => Err(BadgeError::NonTransferable(id)),
            }
        }

        fn check_delegation(
            &self,
            _caller: &Account,
            _delegate: &Account,
            _scope: DelegationScope,
        ) -> BadgeResult<()> {
            Err(BadgeError::ApprovalsDisabled)
        }
    }

    #[test]
    fn test_assign_and_clear() {
        let ledger = InMemoryLedger::new();
        ledger.assign_owner(BadgeId(0), &ALICE).unwrap();
        assert_eq!(ledger.current_owner(BadgeId(0)).unwrap(), Some(ALICE));
        assert_eq!(ledger.balance_of(&ALICE).unwrap(), 1);

        assert_eq!(ledger.clear_owner(BadgeId(0)).unwrap(), ALICE);
        assert_eq!(ledger.current_owner(BadgeId(0)).unwrap(), None);
        assert_eq!(ledger.balance_of(&ALICE).unwrap(), 0);
    }

    #[test]
    fn test_assign_rejects_null_and_live_identifier() {
        let ledger = InMemoryLedger::new();
        assert_eq!(
            ledger.assign_owner(BadgeId(0), &Account::NULL),
            Err(BadgeError::InvalidHolder)
        );
        ledger.assign_owner(BadgeId(0), &ALICE).unwrap();
        assert_eq!(
            ledger.assign_owner(BadgeId(0), &BOB),
            Err(BadgeError::AlreadyAssigned(BadgeId(0)))
        );
    }

    #[test]
    fn test_clear_unknown_is_not_active() {
        let ledger = InMemoryLedger::new();
        assert_eq!(
            ledger.clear_owner(BadgeId(3)),
            Err(BadgeError::NotActive(BadgeId(3)))
        );
    }

    #[test]
    fn test_unguarded_transfer_by_owner() {
        let ledger = InMemoryLedger::new();
        ledger.assign_owner(BadgeId(0), &ALICE).unwrap();
        ledger.transfer(&ALICE, &ALICE, &BOB, BadgeId(0)).unwrap();
        assert_eq!(ledger.current_owner(BadgeId(0)).unwrap(), Some(BOB));
        assert_eq!(ledger.balance_of(&BOB).unwrap(), 1);
        assert_eq!(ledger.balance_of(&ALICE).unwrap(), 0);
    }

    #[test]
    fn test_unguarded_transfer_requires_authorization() {
        let ledger = InMemoryLedger::new();
        ledger.assign_owner(BadgeId(0), &ALICE).unwrap();
        assert!(matches!(
            ledger.transfer(&BOB, &ALICE, &BOB, BadgeId(0)),
            Err(BadgeError::Unauthorized(_))
        ));

        ledger.approve(&ALICE, &BOB, BadgeId(0)).unwrap();
        assert_eq!(ledger.get_approved(BadgeId(0)).unwrap(), Some(BOB));
        ledger.transfer(&BOB, &ALICE, &CAROL, BadgeId(0)).unwrap();
        // Approval does not survive the move
        assert_eq!(ledger.get_approved(BadgeId(0)).unwrap(), None);
    }

    #[test]
    fn test_unguarded_operator_approval() {
        let ledger = InMemoryLedger::new();
        ledger.assign_owner(BadgeId(0), &ALICE).unwrap();
        ledger.set_approval_for_all(&ALICE, &CAROL, true).unwrap();
        assert!(ledger.is_approved_for_all(&ALICE, &CAROL).unwrap());
        ledger.transfer(&CAROL, &ALICE, &BOB, BadgeId(0)).unwrap();
        ledger.set_approval_for_all(&ALICE, &CAROL, false).unwrap();
        assert!(!ledger.is_approved_for_all(&ALICE, &CAROL).unwrap());
    }

    #[test]
    fn test_transfer_to_null_rejected() {
        let ledger = InMemoryLedger::new();
        ledger.assign_owner(BadgeId(0), &ALICE).unwrap();
        assert_eq!(
            ledger.transfer(&ALICE, &ALICE, &Account::NULL, BadgeId(0)),
            Err(BadgeError::InvalidHolder)
        );
    }

    #[test]
    fn test_guard_registers_once() {
        let ledger = InMemoryLedger::new();
        ledger.register_guard(Arc::new(CreationOnly)).unwrap();
        assert!(matches!(
            ledger.register_guard(Arc::new(CreationOnly)),
            Err(BadgeError::Configuration(_))
        ));
    }

    #[test]
    fn test_guard_vetoes_before_authorization() {
        let ledger = InMemoryLedger::new();
        ledger.register_guard(Arc::new(CreationOnly)).unwrap();
        ledger.assign_owner(BadgeId(0), &ALICE).unwrap();

        // BOB is not authorized, but the guard answers first
        assert_eq!(
            ledger.transfer(&BOB, &ALICE, &BOB, BadgeId(0)),
            Err(BadgeError::NonTransferable(BadgeId(0)))
        );
        assert_eq!(ledger.current_owner(BadgeId(0)).unwrap(), Some(ALICE));
        assert_eq!(ledger.balance_of(&ALICE).unwrap(), 1);
    }

    #[test]
    fn test_guard_vetoes_delegation_for_unknown_badge() {
        let ledger = InMemoryLedger::new();
        ledger.register_guard(Arc::new(CreationOnly)).unwrap();
        // Unknown id would normally be NotActive; the guard answers first
        assert_eq!(
            ledger.approve(&ALICE, &BOB, BadgeId(99)),
            Err(BadgeError::ApprovalsDisabled)
        );
        assert_eq!(
            ledger.set_approval_for_all(&ALICE, &Account::NULL, true),
            Err(BadgeError::ApprovalsDisabled)
        );
    }

    #[test]
    fn test_guard_veto_leaves_state_intact() {
        let ledger = InMemoryLedger::new();
        ledger.register_guard(Arc::new(CreationOnly)).unwrap();
        ledger.assign_owner(BadgeId(0), &ALICE).unwrap();
        assert_eq!(
            ledger.clear_owner(BadgeId(0)),
            Err(BadgeError::NonTransferable(BadgeId(0)))
        );
        assert_eq!(ledger.current_owner(BadgeId(0)).unwrap(), Some(ALICE));
        assert_eq!(ledger.balance_of(&ALICE).unwrap(), 1);
    }

    #[test]
    fn test_capabilities() {
        let ledger = InMemoryLedger::new();
        assert!(ledger.supports_capability(CapabilityId::OWNERSHIP));
        assert!(ledger.supports_capability(CapabilityId::OWNERSHIP_METADATA));
        assert!(ledger.supports_capability(CapabilityId::INTROSPECTION));
        assert!(!ledger.supports_capability(CapabilityId::SOULBOUND));
    }
}
