//! Badge lifecycle, end to end against the in-memory ledger and registry.
//!
//! The story:
//!
//! 1. An administrator bootstraps the registry and grants an auditor firm
//!    the issuer role.
//! 2. The firm mints a Gold badge for a protocol team (identifier 0).
//! 3. Someone resubmits the same report; the fingerprint is already spent.
//! 4. An outsider tries to mint; nothing is consumed.
//! 5. The team tries to move and delegate the badge; both are refused.
//! 6. The team gives the badge up; history stays, liveness goes.
//! 7. The administrator tries to revoke it again; it is no longer active.
//! 8. The badge reports locked throughout, and the event chain verifies.

use std::sync::Arc;

use auditmark_core::{
    fingerprint_report, Account, BadgeError, BadgeId, CapabilityId, Level, OwnershipLedger,
    ReportFingerprint, Role,
};
use auditmark_engine::{BadgeEngine, BadgeEventKind, BadgeStatus, EngineConfig, RevokedBy};
use auditmark_ledger::{InMemoryLedger, InMemoryRoles};

const ADMIN: Account = Account([0xad; 20]);
const AUDITOR: Account = Account([0x15; 20]);
const TEAM: Account = Account([0x7e; 20]);
const OUTSIDER: Account = Account([0x0f; 20]);

struct World {
    engine: BadgeEngine,
    ledger: Arc<InMemoryLedger>,
    roles: Arc<InMemoryRoles>,
}

fn world() -> World {
    let roles = Arc::new(InMemoryRoles::with_administrator(ADMIN).unwrap());
    roles.grant_role(&ADMIN, Role::Issuer, AUDITOR).unwrap();
    let ledger = Arc::new(InMemoryLedger::new());
    let engine =
        BadgeEngine::new(ledger.clone(), roles.clone(), EngineConfig::default()).unwrap();
    World {
        engine,
        ledger,
        roles,
    }
}

fn h1() -> ReportFingerprint {
    fingerprint_report(b"audit report: protocol v1, no critical findings")
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn scenario_1_issuer_mints_first_badge() {
    let w = world();
    let id = w
        .engine
        .mint_credential(&AUDITOR, &TEAM, Level::Gold, h1(), "ipfs://a")
        .unwrap();
    assert_eq!(id, BadgeId(0));

    let record = w.engine.get(id).unwrap();
    assert_eq!(record.level(), Level::Gold);
    assert_eq!(record.fingerprint(), &h1());
    assert_eq!(record.location_uri().as_str(), "ipfs://a");
    assert!(!record.is_revoked());

    assert_eq!(w.engine.resolve_metadata_uri(id).unwrap(), "ipfs://a");
    assert_eq!(w.ledger.current_owner(id).unwrap(), Some(TEAM));
}

#[test]
fn scenario_2_duplicate_fingerprint_rejected() {
    let w = world();
    w.engine
        .mint_credential(&AUDITOR, &TEAM, Level::Gold, h1(), "ipfs://a")
        .unwrap();

    let second = w
        .engine
        .mint_credential(&AUDITOR, &OUTSIDER, Level::Bronze, h1(), "ipfs://other");
    assert_eq!(second, Err(BadgeError::DuplicateFingerprint(h1())));
    assert_eq!(w.engine.total_issued().unwrap(), 1);

    let next = w
        .engine
        .mint_credential(
            &AUDITOR,
            &OUTSIDER,
            Level::Bronze,
            fingerprint_report(b"another report"),
            "ipfs://b",
        )
        .unwrap();
    assert_eq!(next, BadgeId(1));
}

#[test]
fn scenario_3_non_issuer_cannot_mint() {
    let w = world();
    for caller in [OUTSIDER, TEAM, ADMIN] {
        assert!(matches!(
            w.engine
                .mint_credential(&caller, &TEAM, Level::Gold, h1(), "ipfs://a"),
            Err(BadgeError::Unauthorized(_))
        ));
    }
    assert_eq!(w.engine.total_issued().unwrap(), 0);
    assert!(!w.engine.is_fingerprint_used(&h1()).unwrap());

    let id = w
        .engine
        .mint_credential(&AUDITOR, &TEAM, Level::Gold, h1(), "ipfs://a")
        .unwrap();
    assert_eq!(id, BadgeId(0), "rejected mints must not consume identifiers");
}

#[test]
fn scenario_4_self_revoke_keeps_history() {
    let w = world();
    let id = w
        .engine
        .mint_credential(&AUDITOR, &TEAM, Level::Gold, h1(), "ipfs://a")
        .unwrap();
    let before = w.engine.get(id).unwrap();

    w.engine.self_revoke(&TEAM, id).unwrap();

    let after = w.engine.get(id).unwrap();
    assert!(after.is_revoked());
    assert_eq!(after.status(), BadgeStatus::Revoked);
    assert_eq!(after.level(), before.level());
    assert_eq!(after.fingerprint(), before.fingerprint());
    assert_eq!(after.location_uri(), before.location_uri());
    assert_eq!(after.issuer(), before.issuer());
    assert_eq!(after.issued_at(), before.issued_at());
    assert_eq!(
        after.revocation().unwrap().revoked_by,
        RevokedBy::Holder(TEAM)
    );

    assert_eq!(
        w.engine.resolve_metadata_uri(id),
        Err(BadgeError::NotActive(id))
    );
    assert_eq!(w.engine.holder_of(id).unwrap(), None);
    assert_eq!(w.engine.balance_of(&TEAM).unwrap(), 0);
    // Approval lookups need a live badge
    assert_eq!(w.engine.get_approved(id), Err(BadgeError::NotActive(id)));
    assert_eq!(
        w.engine.get_approved(BadgeId(7)),
        Err(BadgeError::NotActive(BadgeId(7)))
    );
}

#[test]
fn scenario_5_admin_revoke_after_self_revoke() {
    let w = world();
    let id = w
        .engine
        .mint_credential(&AUDITOR, &TEAM, Level::Gold, h1(), "ipfs://a")
        .unwrap();
    w.engine.self_revoke(&TEAM, id).unwrap();

    assert_eq!(
        w.engine.admin_revoke(&ADMIN, id, Some("duplicate")),
        Err(BadgeError::NotActive(id))
    );
    let record = w.engine.get(id).unwrap();
    assert!(record.is_revoked());
    assert_eq!(
        record.revocation().unwrap().revoked_by,
        RevokedBy::Holder(TEAM),
        "the first revocation is the one on record"
    );
}

#[test]
fn scenario_6_always_locked() {
    let w = world();
    let id = w
        .engine
        .mint_credential(&AUDITOR, &TEAM, Level::Gold, h1(), "ipfs://a")
        .unwrap();
    assert!(w.engine.is_locked(id).unwrap());
    w.engine.admin_revoke(&ADMIN, id, None).unwrap();
    assert!(w.engine.is_locked(id).unwrap());
    assert_eq!(
        w.engine.is_locked(BadgeId(1)),
        Err(BadgeError::UnknownIdentifier(BadgeId(1)))
    );
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn identifiers_follow_successful_mint_count() {
    let w = world();
    let mut successes = 0u64;
    for n in 0u8..12 {
        // Every third attempt reuses a spent fingerprint and must not count
        let fp = if n % 3 == 2 {
            ReportFingerprint([n - 1; 32])
        } else {
            ReportFingerprint([n + 1; 32])
        };
        match w
            .engine
            .mint_credential(&AUDITOR, &TEAM, Level::Silver, fp, "ipfs://x")
        {
            Ok(id) => {
                assert_eq!(id, BadgeId(successes));
                successes += 1;
            }
            Err(e) => assert!(matches!(e, BadgeError::DuplicateFingerprint(_))),
        }
    }
    assert_eq!(w.engine.total_issued().unwrap(), successes);
    assert_eq!(w.engine.balance_of(&TEAM).unwrap(), successes);
}

#[test]
fn fingerprint_stays_spent_after_revocation() {
    let w = world();
    let id = w
        .engine
        .mint_credential(&AUDITOR, &TEAM, Level::Gold, h1(), "ipfs://a")
        .unwrap();
    w.engine.admin_revoke(&ADMIN, id, Some("report withdrawn")).unwrap();

    assert_eq!(
        w.engine
            .mint_credential(&AUDITOR, &TEAM, Level::Gold, h1(), "ipfs://a"),
        Err(BadgeError::DuplicateFingerprint(h1()))
    );
    assert!(w.engine.is_fingerprint_used(&h1()).unwrap());
}

#[test]
fn transfers_rejected_without_side_effects() {
    let w = world();
    let id = w
        .engine
        .mint_credential(&AUDITOR, &TEAM, Level::Gold, h1(), "ipfs://a")
        .unwrap();
    let record = w.engine.get(id).unwrap();
    let events = w.engine.events().unwrap().len();

    for caller in [TEAM, ADMIN, AUDITOR, OUTSIDER] {
        assert_eq!(
            w.engine.transfer_from(&caller, &TEAM, &OUTSIDER, id),
            Err(BadgeError::NonTransferable(id))
        );
    }
    // The ledger's own entry point is guarded too
    assert_eq!(
        w.ledger.transfer(&TEAM, &TEAM, &OUTSIDER, id),
        Err(BadgeError::NonTransferable(id))
    );

    assert_eq!(w.engine.get(id).unwrap(), record);
    assert_eq!(w.engine.holder_of(id).unwrap(), Some(TEAM));
    assert_eq!(w.engine.balance_of(&OUTSIDER).unwrap(), 0);
    assert_eq!(w.engine.total_issued().unwrap(), 1);
    assert_eq!(w.engine.events().unwrap().len(), events);
}

#[test]
fn approvals_disabled_for_everyone() {
    let w = world();
    let id = w
        .engine
        .mint_credential(&AUDITOR, &TEAM, Level::Gold, h1(), "ipfs://a")
        .unwrap();

    for caller in [TEAM, ADMIN, AUDITOR, OUTSIDER] {
        assert_eq!(
            w.engine.approve(&caller, &OUTSIDER, id),
            Err(BadgeError::ApprovalsDisabled)
        );
        assert_eq!(
            w.engine.set_approval_for_all(&caller, &OUTSIDER, true),
            Err(BadgeError::ApprovalsDisabled)
        );
    }
    // Even for an identifier that was never issued
    assert_eq!(
        w.engine.approve(&TEAM, &OUTSIDER, BadgeId(77)),
        Err(BadgeError::ApprovalsDisabled)
    );
    assert_eq!(
        w.ledger.approve(&TEAM, &OUTSIDER, id),
        Err(BadgeError::ApprovalsDisabled)
    );

    assert_eq!(w.engine.get_approved(id).unwrap(), None);
    assert!(!w.engine.is_approved_for_all(&TEAM, &OUTSIDER).unwrap());
}

#[test]
fn double_revocation_leaves_one_event() {
    let w = world();
    let id = w
        .engine
        .mint_credential(&AUDITOR, &TEAM, Level::Gold, h1(), "ipfs://a")
        .unwrap();
    w.engine.admin_revoke(&ADMIN, id, None).unwrap();
    assert_eq!(
        w.engine.admin_revoke(&ADMIN, id, None),
        Err(BadgeError::NotActive(id))
    );
    assert_eq!(
        w.engine.self_revoke(&TEAM, id),
        Err(BadgeError::NotActive(id))
    );

    let revocations = w
        .engine
        .events()
        .unwrap()
        .into_iter()
        .filter(|e| {
            matches!(
                e.event.kind,
                BadgeEventKind::SelfRevoked { .. } | BadgeEventKind::AdminRevoked { .. }
            )
        })
        .count();
    assert_eq!(revocations, 1);
    assert!(w.engine.get(id).unwrap().is_revoked());
}

#[test]
fn administrator_revokes_without_holder() {
    let w = world();
    let id = w
        .engine
        .mint_credential(&AUDITOR, &TEAM, Level::Bronze, h1(), "ipfs://a")
        .unwrap();
    w.engine
        .admin_revoke(&ADMIN, id, Some("holder key lost"))
        .unwrap();

    let record = w.engine.get(id).unwrap();
    let info = record.revocation().unwrap();
    assert_eq!(info.revoked_by, RevokedBy::Administrator(ADMIN));
    assert_eq!(info.reason.as_deref(), Some("holder key lost"));
    assert_eq!(w.engine.holder_of(id).unwrap(), None);
}

#[test]
fn revoked_issuer_can_no_longer_mint() {
    let w = world();
    w.engine
        .mint_credential(&AUDITOR, &TEAM, Level::Gold, h1(), "ipfs://a")
        .unwrap();
    w.roles.revoke_role(&ADMIN, Role::Issuer, &AUDITOR).unwrap();
    assert!(matches!(
        w.engine.mint_credential(
            &AUDITOR,
            &TEAM,
            Level::Gold,
            fingerprint_report(b"later"),
            "ipfs://b"
        ),
        Err(BadgeError::Unauthorized(_))
    ));
    // Existing badges are unaffected
    assert_eq!(w.engine.status(BadgeId(0)).unwrap(), BadgeStatus::Active);
}

#[test]
fn direct_clear_owner_cannot_strand_a_badge() {
    let w = world();
    let id = w
        .engine
        .mint_credential(&AUDITOR, &TEAM, Level::Gold, h1(), "ipfs://a")
        .unwrap();

    assert!(matches!(
        w.ledger.clear_owner(id),
        Err(BadgeError::Unauthorized(_))
    ));
    assert_eq!(w.ledger.current_owner(id).unwrap(), Some(TEAM));
    assert_eq!(w.engine.status(id).unwrap(), BadgeStatus::Active);
    assert_eq!(w.engine.live_count().unwrap(), 1);

    // The badge is still revocable through the engine
    w.engine
        .admin_revoke(&ADMIN, id, Some("report withdrawn"))
        .unwrap();
    assert_eq!(w.engine.status(id).unwrap(), BadgeStatus::Revoked);
    assert_eq!(w.ledger.current_owner(id).unwrap(), None);
    assert_eq!(w.engine.live_count().unwrap(), 0);
}

#[test]
fn direct_assign_owner_cannot_squat_an_identifier() {
    let w = world();

    assert!(matches!(
        w.ledger.assign_owner(BadgeId(0), &OUTSIDER),
        Err(BadgeError::Unauthorized(_))
    ));
    assert_eq!(w.ledger.current_owner(BadgeId(0)).unwrap(), None);
    assert_eq!(w.ledger.balance_of(&OUTSIDER).unwrap(), 0);

    // The next mint still lands on identifier 0
    let id = w
        .engine
        .mint_credential(&AUDITOR, &TEAM, Level::Silver, h1(), "ipfs://a")
        .unwrap();
    assert_eq!(id, BadgeId(0));
    assert_eq!(w.ledger.current_owner(id).unwrap(), Some(TEAM));

    // A live identifier cannot be reassigned either
    assert!(w.ledger.assign_owner(id, &OUTSIDER).is_err());
    assert_eq!(w.ledger.current_owner(id).unwrap(), Some(TEAM));
}

#[test]
fn capability_discovery() {
    let w = world();
    assert!(w.engine.supports_capability(CapabilityId::SOULBOUND));
    assert!(w.engine.supports_capability(CapabilityId::OWNERSHIP));
    assert!(w.engine.supports_capability(CapabilityId::OWNERSHIP_METADATA));
    assert!(w.engine.supports_capability(CapabilityId::ROLE_REGISTRY));
    assert!(w.engine.supports_capability(CapabilityId::INTROSPECTION));
    assert!(!w
        .engine
        .supports_capability(CapabilityId([0xde, 0xad, 0xbe, 0xef])));
}

#[test]
fn event_chain_tells_the_whole_story() {
    let w = world();
    let a = w
        .engine
        .mint_credential(&AUDITOR, &TEAM, Level::Gold, h1(), "ipfs://a")
        .unwrap();
    let b = w
        .engine
        .mint_credential(
            &AUDITOR,
            &OUTSIDER,
            Level::Silver,
            fingerprint_report(b"second"),
            "ipfs://b",
        )
        .unwrap();
    w.engine.self_revoke(&TEAM, a).unwrap();
    w.engine.admin_revoke(&ADMIN, b, Some("scope error")).unwrap();

    let kinds: Vec<BadgeEventKind> = w
        .engine
        .events()
        .unwrap()
        .into_iter()
        .map(|e| e.event.kind)
        .collect();
    assert_eq!(kinds.len(), 6);
    assert!(matches!(kinds[0], BadgeEventKind::Minted { id, .. } if id == a));
    assert_eq!(kinds[1], BadgeEventKind::Locked { id: a });
    assert!(matches!(kinds[2], BadgeEventKind::Minted { id, .. } if id == b));
    assert_eq!(kinds[3], BadgeEventKind::Locked { id: b });
    assert_eq!(
        kinds[4],
        BadgeEventKind::SelfRevoked { id: a, holder: TEAM }
    );
    assert_eq!(
        kinds[5],
        BadgeEventKind::AdminRevoked {
            id: b,
            admin: ADMIN,
            holder: OUTSIDER,
            reason: Some("scope error".into()),
        }
    );
    assert!(w.engine.verify_events().unwrap());
}

#[test]
fn oversized_uri_rejected_at_boundary() {
    let w = world();
    let max = "u".repeat(auditmark_core::MAX_URI_LEN);
    w.engine
        .mint_credential(&AUDITOR, &TEAM, Level::Gold, h1(), &max)
        .unwrap();
    let over = "u".repeat(auditmark_core::MAX_URI_LEN + 1);
    assert!(matches!(
        w.engine.mint_credential(
            &AUDITOR,
            &TEAM,
            Level::Gold,
            fingerprint_report(b"x"),
            &over
        ),
        Err(BadgeError::InvalidMetadata(_))
    ));
    assert_eq!(w.engine.total_issued().unwrap(), 1);
}
