//! Reference implementations of the two collaborators the badge engine
//! consumes: the ownership ledger (who currently holds which identifier)
//! and the role registry (who may issue, who may govern).

pub mod ownership;
pub mod roles;

pub use ownership::InMemoryLedger;
pub use roles::InMemoryRoles;
