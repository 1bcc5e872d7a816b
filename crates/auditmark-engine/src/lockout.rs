//! Soulbound lockout.
//!
//! Holder-to-holder moves and delegation grants are refused outright. The
//! only holder changes that commit are creation (none -> holder) and
//! destruction (holder -> none), and each of those needs a one-shot permit
//! the engine arms for the exact identifier and holder it is about to
//! commit. A ledger call made from anywhere else finds no permit and is
//! refused, so liveness cannot drift from the history kept by the engine.

use auditmark_core::{Account, BadgeError, BadgeId, BadgeResult, DelegationScope, TransferGuard};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A single holder change the engine is about to commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Permit {
    Create { id: BadgeId, holder: Account },
    Destroy { id: BadgeId, holder: Account },
}

#[derive(Debug, Default)]
pub struct SoulboundGuard {
    armed: Mutex<Option<Permit>>,
}

impl SoulboundGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Permit>> {
        // The slot holds plain data; a poisoned lock still has a usable value.
        self.armed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `commit` with `permit` armed, and disarm afterwards whatever the
    /// outcome.
    pub(crate) fn with_permit<T>(
        &self,
        permit: Permit,
        commit: impl FnOnce() -> BadgeResult<T>,
    ) -> BadgeResult<T> {
        *self.slot() = Some(permit);
        let result = commit();
        *self.slot() = None;
        result
    }

    /// Consume the armed permit if it is exactly `expected`.
    fn redeem(&self, expected: Permit) -> BadgeResult<()> {
        let mut slot = self.slot();
        if *slot == Some(expected) {
            *slot = None;
            Ok(())
        } else {
            Err(BadgeError::Unauthorized(format!(
                "holder change for badge {} was not committed by the lifecycle engine",
                permit_id(&expected)
            )))
        }
    }
}

fn permit_id(permit: &Permit) -> BadgeId {
    match permit {
        Permit::Create { id, .. } | Permit::Destroy { id, .. } => *id,
    }
}

impl TransferGuard for SoulboundGuard {
    fn check_transition(
        &self,
        id: BadgeId,
        from: Option<&Account>,
        to: Option<&Account>,
    ) -> BadgeResult<()> {
        match (from, to) {
            (Some(_), Some(_)) => Err(BadgeError::NonTransferable(id)),
            (None, Some(holder)) => self.redeem(Permit::Create {
                id,
                holder: *holder,
            }),
            (Some(holder), None) => self.redeem(Permit::Destroy {
                id,
                holder: *holder,
            }),
            (None, None) => Err(BadgeError::InvalidHolder),
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
