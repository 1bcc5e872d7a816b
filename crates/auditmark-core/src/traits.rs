use std::sync::Arc;

use crate::error::BadgeResult;
use crate::types::{Account, BadgeId, CapabilityId, DelegationScope, Role};

// ---------------------------------------------------------------------------
// TransferGuard: veto point consulted before every ownership change
//
// Registered once with an OwnershipLedger. The ledger must call
// `check_transition` before committing any holder change and
// `check_delegation` before doing any work on an approval request.
// ---------------------------------------------------------------------------

pub trait TransferGuard: Send + Sync {
    /// `from == None` is a creation, `to == None` is a destruction.
    fn check_transition(
        &self,
        id: BadgeId,
        from: Option<&Account>,
        to: Option<&Account>,
    ) -> BadgeResult<()>;

    fn check_delegation(
        &self,
        caller: &Account,
        delegate: &Account,
        scope: DelegationScope,
    ) -> BadgeResult<()>;
}

// ---------------------------------------------------------------------------
// OwnershipLedger: identifier/holder bookkeeping (the liveness tier)
//
// `assign_owner` and `clear_owner` are privileged creation and destruction
// entry points for the engine that owns the ledger. The caller-facing
// `transfer`/`approve` family carries the standard token semantics and is
// subject to the registered guard.
// ---------------------------------------------------------------------------

pub trait OwnershipLedger: Send + Sync {
    /// Register the sole arbiter of ownership changes. Fails if one is
    /// already registered.
    fn register_guard(&self, guard: Arc<dyn TransferGuard>) -> BadgeResult<()>;

    fn assign_owner(&self, id: BadgeId, holder: &Account) -> BadgeResult<()>;

    /// Returns the holder that was cleared.
    fn clear_owner(&self, id: BadgeId) -> BadgeResult<Account>;

    fn current_owner(&self, id: BadgeId) -> BadgeResult<Option<Account>>;

    fn balance_of(&self, holder: &Account) -> BadgeResult<u64>;

    fn transfer(
        &self,
        caller: &Account,
        from: &Account,
        to: &Account,
        id: BadgeId,
    ) -> BadgeResult<()>;

    fn approve(&self, caller: &Account, spender: &Account, id: BadgeId) -> BadgeResult<()>;

    fn set_approval_for_all(
        &self,
        caller: &Account,
        operator: &Account,
        approved: bool,
    ) -> BadgeResult<()>;

    fn get_approved(&self, id: BadgeId) -> BadgeResult<Option<Account>>;

    fn is_approved_for_all(&self, owner: &Account, operator: &Account) -> BadgeResult<bool>;

    fn supports_capability(&self, id: CapabilityId) -> bool;
}

// ---------------------------------------------------------------------------
// RoleRegistry: capability membership, governed outside the engine
// ---------------------------------------------------------------------------

pub trait RoleRegistry: Send + Sync {
    fn has_role(&self, account: &Account, role: Role) -> BadgeResult<bool>;

    fn supports_capability(&self, id: CapabilityId) -> bool;
}
