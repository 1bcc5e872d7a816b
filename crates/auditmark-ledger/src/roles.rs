use auditmark_core::{Account, BadgeError, BadgeResult, CapabilityId, Role, RoleRegistry};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

/// In-memory role membership with administrator-gated governance.
///
/// `seed` bypasses governance and exists for bootstrapping from
/// configuration. After that, only administrators may grant or revoke, and
/// the last administrator cannot be removed.
pub struct InMemoryRoles {
    members: Mutex<HashMap<Role, BTreeSet<Account>>>,
}

fn lock_members(
    mutex: &Mutex<HashMap<Role, BTreeSet<Account>>>,
) -> BadgeResult<MutexGuard<'_, HashMap<Role, BTreeSet<Account>>>> {
    mutex
        .lock()
        .map_err(|e| BadgeError::Storage(format!("role registry lock poisoned: {}", e)))
}

impl InMemoryRoles {
    pub fn new() -> Self {
        Self {
            members: Mutex::new(HashMap::new()),
        }
    }

    /// Registry with a single bootstrap administrator.
    pub fn with_administrator(admin: Account) -> BadgeResult<Self> {
        let roles = Self::new();
        roles.seed(Role::Administrator, admin)?;
        Ok(roles)
    }

    pub fn seed(&self, role: Role, account: Account) -> BadgeResult<()> {
        if account.is_null() {
            return Err(BadgeError::InvalidHolder);
        }
        let mut members = lock_members(&self.members)?;
        members.entry(role).or_default().insert(account);
        Ok(())
    }

    /// Returns true if the account did not already hold the role.
    pub fn grant_role(&self, caller: &Account, role: Role, account: Account) -> BadgeResult<bool> {
        if account.is_null() {
            return Err(BadgeError::InvalidHolder);
        }
        let mut members = lock_members(&self.members)?;
        Self::require_admin(&members, caller)?;
        let granted = members.entry(role).or_default().insert(account);
        if granted {
            tracing::info!(role = %role, account = %account, by = %caller, "role granted");
        }
        Ok(granted)
    }

    /// Returns true if the account held the role.
    pub fn revoke_role(&self, caller: &Account, role: Role, account: &Account) -> BadgeResult<bool> {
        let mut members = lock_members(&self.members)?;
        Self::require_admin(&members, caller)?;
        Self::remove(&mut members, role, account, caller)
    }

    /// Give up one of the caller's own roles.
    pub fn renounce_role(&self, caller: &Account, role: Role) -> BadgeResult<bool> {
        let mut members = lock_members(&self.members)?;
        Self::remove(&mut members, role, caller, caller)
    }

    pub fn members(&self, role: Role) -> BadgeResult<Vec<Account>> {
        let members = lock_members(&self.members)?;
        Ok(members
            .get(&role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    fn require_admin(
        members: &HashMap<Role, BTreeSet<Account>>,
        caller: &Account,
    ) -> BadgeResult<()> {
        let is_admin = members
            .get(&Role::Administrator)
            .is_some_and(|set| set.contains(caller));
        if is_admin {
            Ok(())
        } else {
            tracing::warn!(caller = %caller, "role change rejected: caller is not an administrator");
            Err(BadgeError::Unauthorized(format!(
                "{} lacks the {} role",
                caller,
                Role::Administrator
            )))
        }
    }

    fn remove(
        members: &mut HashMap<Role, BTreeSet<Account>>,
        role: Role,
        account: &Account,
        caller: &Account,
    ) -> BadgeResult<bool> {
        let Some(set) = members.get_mut(&role) else {
            return Ok(false);
        };
        if role == Role::Administrator && set.len() == 1 && set.contains(account) {
            return Err(BadgeError::Configuration(
                "the last administrator cannot be removed".into(),
            ));
        }
        let removed = set.remove(account);
        if removed {
            tracing::info!(role = %role, account = %account, by = %caller, "role revoked");
        }
        Ok(removed)
    }
}

impl Default for InMemoryRoles {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleRegistry for InMemoryRoles {
    fn has_role(&self, account: &Account, role: Role) -> BadgeResult<bool> {
        let members = lock_members(&self.members)?;
        Ok(members.get(&role).is_some_and(|set| set.contains(account)))
    }

    fn supports_capability(&self, id: CapabilityId) -> bool {
        id == CapabilityId::INTROSPECTION || id == CapabilityId::ROLE_REGISTRY
    }
}
