//! Auditmark Lifecycle Engine
//!
//! Issues soulbound audit badges: non-transferable certificates attesting
//! that an entity passed a security audit at a given level, bound to the
//! SHA-256 fingerprint of the audit report.
//!
//! The engine keeps the history tier (records that are never deleted, a
//! fingerprint set that never shrinks, a counter that never goes back) and
//! delegates liveness to an `OwnershipLedger`. At construction it registers
//! a `SoulboundGuard` with that ledger, so no holder-to-holder move and no
//! approval can ever commit, whichever entry point is used. Creation and
//! destruction commit only when the engine itself arms the guard for them.

pub mod engine;
pub mod events;
pub mod lockout;
pub mod status;
pub mod store;
pub mod types;

pub use engine::BadgeEngine;
pub use events::{BadgeEvent, BadgeEventKind, EventChain, EventEntry};
pub use lockout::SoulboundGuard;
pub use status::is_valid_transition;
pub use types::*;
