//! Permission and rule resolution through the engine facade.

mod common;

use claims_engine::access::{Allowance, DenialNotice, RuleVerdict, Verdict};
use claims_engine::actors::ActorId;
use claims_engine::claims::{Claim, Partition};
use claims_engine::config::RuleEnforcement;
use claims_engine::error::ClaimError;
use claims_engine::repository::{ClaimRepository, GrantRecord, MemoryRepository, RuleRecord};
use claims_engine::world::position::Position;
use common::{EventKind, Perm, Rule, TestEvent, WORLD, claim_rect, engine, engine_with};

// ---------------------------------------------------------------------------
// Permission path
// ---------------------------------------------------------------------------

#[test]
fn stranger_breaking_inside_a_claim_is_denied_once() {
    let mut engine = engine();
    let (p1, p2) = (ActorId::random(), ActorId::random());
    engine.connect(p1, "Alice");
    engine.connect(p2, "Bob");
    // Spans chunks (0,0) to (1,1).
    let claim = claim_rect(&mut engine, p1, 0, 0, 31, 31);

    let mut event = TestEvent::at(EventKind::BlockBreak, p2, 20, 5);
    let mut notices: Vec<DenialNotice> = Vec::new();
    let verdict = engine.check_permission(&mut event, &mut notices);

    assert_eq!(verdict, Verdict::Denied { claim, kind: Perm::Build });
    assert!(event.cancelled);
    assert_eq!(event.handled, 1);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].actor, p2);
    assert_eq!(notices[0].owner, p1);
    assert_eq!(notices[0].message(), "You can't do that in Alice's claim!");
}

#[test]
fn owner_is_always_allowed() {
    let mut engine = engine();
    let owner = ActorId::random();
    engine.connect(owner, "Alice");
    claim_rect(&mut engine, owner, 0, 0, 15, 15);

    let mut notices: Vec<DenialNotice> = Vec::new();
    for kind in [EventKind::BlockBreak, EventKind::CropBreak, EventKind::ChestOpen] {
        let mut event = TestEvent::at(kind, owner, 3, 3);
        let verdict = engine.check_permission(&mut event, &mut notices);
        assert_eq!(verdict, Verdict::Allowed(Allowance::Owner));
        assert_eq!(event.handled, 0);
    }
    assert!(notices.is_empty());
}

#[test]
fn override_is_always_allowed() {
    let mut engine = engine();
    let (owner, admin) = (ActorId::random(), ActorId::random());
    engine.connect(admin, "Admin");
    claim_rect(&mut engine, owner, 0, 0, 15, 15);
    assert!(engine.set_override(admin, true));

    let mut notices: Vec<DenialNotice> = Vec::new();
    let mut event = TestEvent::at(EventKind::ChestOpen, admin, 3, 3);
    assert_eq!(
        engine.check_permission(&mut event, &mut notices),
        Verdict::Allowed(Allowance::Override)
    );

    engine.set_override(admin, false);
    let mut event = TestEvent::at(EventKind::ChestOpen, admin, 3, 3);
    assert!(engine.check_permission(&mut event, &mut notices).is_denied());
    assert_eq!(notices.len(), 1);
}

#[test]
fn direct_grant_covers_descendants_only() {
    let mut engine = engine();
    let (owner, friend) = (ActorId::random(), ActorId::random());
    let claim = claim_rect(&mut engine, owner, 0, 0, 15, 15);
    engine.grant(claim, friend, Perm::Build).unwrap();

    let mut notices: Vec<DenialNotice> = Vec::new();
    let mut event = TestEvent::at(EventKind::BlockBreak, friend, 1, 1);
    assert_eq!(
        engine.check_permission(&mut event, &mut notices),
        Verdict::Allowed(Allowance::Granted)
    );
    // Harvest is a child of Build.
    let mut event = TestEvent::at(EventKind::CropBreak, friend, 1, 1);
    assert_eq!(
        engine.check_permission(&mut event, &mut notices),
        Verdict::Allowed(Allowance::Granted)
    );
    assert!(notices.is_empty());

    let mut event = TestEvent::at(EventKind::ChestOpen, friend, 1, 1);
    assert_eq!(
        engine.check_permission(&mut event, &mut notices),
        Verdict::Denied { claim, kind: Perm::Container }
    );
    assert_eq!(event.handled, 1);
    assert_eq!(notices.len(), 1);
}

#[test]
fn handler_taking_no_action_moves_on_to_the_next_kind() {
    let mut engine = engine();
    let (owner, picker) = (ActorId::random(), ActorId::random());
    let claim = claim_rect(&mut engine, owner, 0, 0, 15, 15);
    engine.grant(claim, picker, Perm::Harvest).unwrap();

    // Build's crop handler passes, Harvest is held: allowed.
    let mut notices: Vec<DenialNotice> = Vec::new();
    let mut event = TestEvent::at(EventKind::CropBreak, picker, 2, 2);
    assert_eq!(
        engine.check_permission(&mut event, &mut notices),
        Verdict::Allowed(Allowance::NoAction)
    );
    assert_eq!(event.handled, 1);
    assert!(!event.cancelled);

    // A stranger gets past Build's handler and is stopped by Harvest's.
    let stranger = ActorId::random();
    let mut event = TestEvent::at(EventKind::CropBreak, stranger, 2, 2);
    assert_eq!(
        engine.check_permission(&mut event, &mut notices),
        Verdict::Denied { claim, kind: Perm::Harvest }
    );
    assert_eq!(event.handled, 2);
    assert_eq!(notices.len(), 1);
}

#[test]
fn personal_grants_shadow_claim_defaults() {
    let mut engine = engine();
    let (owner, builder, visitor) = (ActorId::random(), ActorId::random(), ActorId::random());
    let claim = claim_rect(&mut engine, owner, 0, 0, 15, 15);
    engine.grant_default(claim, Perm::Container).unwrap();
    engine.grant(claim, builder, Perm::Build).unwrap();

    let mut notices: Vec<DenialNotice> = Vec::new();
    let mut event = TestEvent::at(EventKind::ChestOpen, visitor, 4, 4);
    assert!(engine.check_permission(&mut event, &mut notices).is_allowed());

    let mut event = TestEvent::at(EventKind::ChestOpen, builder, 4, 4);
    assert!(engine.check_permission(&mut event, &mut notices).is_denied());

    engine.revoke(claim, builder, Perm::Build).unwrap();
    let mut event = TestEvent::at(EventKind::ChestOpen, builder, 4, 4);
    assert!(engine.check_permission(&mut event, &mut notices).is_allowed());
}

#[test]
fn absent_claims_and_malformed_events_are_allowed() {
    let mut engine = engine();
    let (owner, other) = (ActorId::random(), ActorId::random());
    claim_rect(&mut engine, owner, 0, 0, 15, 15);
    let mut notices: Vec<DenialNotice> = Vec::new();

    let mut outside = TestEvent::at(EventKind::BlockBreak, other, 100, 100);
    assert_eq!(
        engine.check_permission(&mut outside, &mut notices),
        Verdict::Allowed(Allowance::Unclaimed)
    );

    let mut nobody = TestEvent::at(EventKind::BlockBreak, other, 1, 1);
    nobody.actor = None;
    assert_eq!(
        engine.check_permission(&mut nobody, &mut notices),
        Verdict::Allowed(Allowance::OutOfScope)
    );

    let mut nowhere = TestEvent::at(EventKind::BlockBreak, other, 1, 1);
    nowhere.location = None;
    assert_eq!(
        engine.check_permission(&mut nowhere, &mut notices),
        Verdict::Allowed(Allowance::OutOfScope)
    );

    let mut chat = TestEvent::at(EventKind::Chat, other, 1, 1);
    assert_eq!(
        engine.check_permission(&mut chat, &mut notices),
        Verdict::Allowed(Allowance::Ungoverned)
    );
    assert!(notices.is_empty());
}

#[test]
fn offline_owner_is_named_by_id_when_never_seen() {
    let mut engine = engine();
    let (owner, other) = (ActorId::random(), ActorId::random());
    claim_rect(&mut engine, owner, 0, 0, 15, 15);
    let mut notices: Vec<DenialNotice> = Vec::new();
    let mut event = TestEvent::at(EventKind::BlockBreak, other, 1, 1);
    engine.check_permission(&mut event, &mut notices);
    assert_eq!(notices[0].owner_name, owner.to_string());

    engine.remember_name(owner, "Carol");
    let mut event = TestEvent::at(EventKind::BlockBreak, other, 1, 1);
    engine.check_permission(&mut event, &mut notices);
    assert_eq!(notices[1].owner_name, "Carol");
}

// ---------------------------------------------------------------------------
// Rule path
// ---------------------------------------------------------------------------

fn blast(xs: &[i64]) -> TestEvent {
    TestEvent::spread(EventKind::Explode, xs.iter().map(|x| Position::flat(*x, 5)).collect())
}

/// Stops at the first claim lacking the rule: C2 is never consulted. This
/// is the default enforcement and is kept deliberately.
#[test]
fn first_lacking_claim_short_circuits() {
    let mut engine = engine();
    let owner = ActorId::random();
    let c1 = claim_rect(&mut engine, owner, 0, 0, 9, 9);
    let c2 = claim_rect(&mut engine, owner, 20, 0, 29, 9);
    engine.enable_rule(c2, Rule::Explosions).unwrap();

    let mut event = blast(&[5, 25]);
    let verdict = engine.check_rule(&mut event);
    assert_eq!(
        verdict,
        RuleVerdict::Suppressed {
            kind: Rule::Explosions,
            lacking: vec![c1],
            checked: 1,
        }
    );
    assert_eq!(event.handled, 1);
    assert!(event.cancelled);

    // Both lacking: still only C1 is reported.
    engine.disable_rule(c2, Rule::Explosions).unwrap();
    let mut event = blast(&[5, 25]);
    match engine.check_rule(&mut event) {
        RuleVerdict::Suppressed { lacking, checked, .. } => {
            assert_eq!(lacking, vec![c1]);
            assert_eq!(checked, 1);
        }
        other => panic!("expected suppression, got {other:?}"),
    }
    assert_eq!(event.handled, 1);
}

#[test]
fn any_lacking_consults_every_claim_but_suppresses_once() {
    let mut engine = engine_with(MemoryRepository::new(), RuleEnforcement::AnyLacking);
    let owner = ActorId::random();
    let c1 = claim_rect(&mut engine, owner, 0, 0, 9, 9);
    let c2 = claim_rect(&mut engine, owner, 20, 0, 29, 9);

    let mut event = blast(&[5, 25, 6]);
    assert_eq!(
        engine.check_rule(&mut event),
        RuleVerdict::Suppressed {
            kind: Rule::Explosions,
            lacking: vec![c1, c2],
            checked: 2,
        }
    );
    assert_eq!(event.handled, 1);
}

#[test]
fn rule_allows_when_every_claim_enables_it() {
    let mut engine = engine();
    let owner = ActorId::random();
    let c1 = claim_rect(&mut engine, owner, 0, 0, 9, 9);
    let c2 = claim_rect(&mut engine, owner, 20, 0, 29, 9);
    engine.enable_rule(c1, Rule::Explosions).unwrap();
    engine.enable_rule(c2, Rule::Explosions).unwrap();

    let mut event = blast(&[5, 25]);
    assert_eq!(engine.check_rule(&mut event), RuleVerdict::Allowed(Allowance::RuleEnabled));
    assert_eq!(event.handled, 0);

    // Fluids are governed by a different rule.
    let mut flow = TestEvent::spread(EventKind::FluidFlow, vec![Position::flat(5, 5)]);
    assert!(!engine.check_rule(&mut flow).is_allowed());

    let mut wild = blast(&[100, 200]);
    assert_eq!(engine.check_rule(&mut wild), RuleVerdict::Allowed(Allowance::Unclaimed));

    let mut chat = TestEvent::spread(EventKind::Chat, vec![Position::flat(5, 5)]);
    assert_eq!(engine.check_rule(&mut chat), RuleVerdict::Allowed(Allowance::Ungoverned));
}

#[test]
fn dispatch_runs_both_paths() {
    let mut engine = engine();
    let (owner, other) = (ActorId::random(), ActorId::random());
    claim_rect(&mut engine, owner, 0, 0, 9, 9);

    let mut notices: Vec<DenialNotice> = Vec::new();
    let mut event = TestEvent::at(EventKind::BlockBreak, other, 1, 1);
    let outcome = engine.dispatch(&mut event, &mut notices);
    assert!(outcome.blocked());
    assert!(outcome.rule.is_allowed());

    let mut event = TestEvent::at(EventKind::BlockBreak, owner, 1, 1);
    assert!(!engine.dispatch(&mut event, &mut notices).blocked());
}

// ---------------------------------------------------------------------------
// Persistence of grants and rules
// ---------------------------------------------------------------------------

#[test]
fn grants_and_rules_survive_a_reload() {
    let mut repo = MemoryRepository::new();
    let owner = ActorId::random();
    let friend = ActorId::random();
    let claim = Claim::new(WORLD, owner, Position::flat(0, 0));
    let id = claim.id;
    repo.insert_claim(&claim).unwrap();
    repo.insert_partition(&Partition::new(id, Position::flat(0, 0), Position::flat(9, 9)))
        .unwrap();
    repo.save_grant(&GrantRecord {
        claim: id,
        actor: friend,
        permission: "container".into(),
    })
    .unwrap();
    repo.save_grant(&GrantRecord {
        claim: id,
        actor: friend,
        permission: "teleport".into(),
    })
    .unwrap();
    repo.save_rule(&RuleRecord {
        claim: id,
        rule: "explosions".into(),
    })
    .unwrap();

    let engine = engine_with(repo, RuleEnforcement::FirstLacking);
    let held = engine.grants().effective(id, friend).unwrap();
    assert_eq!(held.len(), 1);
    assert!(held.contains(&Perm::Container));
    assert!(engine.rules().has_rule(id, Rule::Explosions));
}

#[test]
fn grant_write_failure_changes_nothing() {
    let mut repo = MemoryRepository::new();
    let owner = ActorId::random();
    let claim = Claim::new(WORLD, owner, Position::flat(0, 0));
    let id = claim.id;
    repo.insert_claim(&claim).unwrap();
    repo.fail_writes = true;

    let mut engine = engine_with(repo, RuleEnforcement::FirstLacking);
    let friend = ActorId::random();
    assert!(matches!(
        engine.grant(id, friend, Perm::Build),
        Err(ClaimError::Repository(_))
    ));
    assert!(engine.grants().effective(id, friend).is_none());
    assert!(engine.enable_rule(id, Rule::Fluids).is_err());
    assert!(!engine.rules().has_rule(id, Rule::Fluids));
    assert!(engine.repository().load_grants().unwrap().is_empty());
}

#[test]
fn grants_write_through_by_identifier() {
    let mut engine = engine();
    let (owner, friend) = (ActorId::random(), ActorId::random());
    let claim = claim_rect(&mut engine, owner, 0, 0, 9, 9);
    assert!(engine.grant(claim, friend, Perm::Harvest).unwrap());
    assert!(!engine.grant(claim, friend, Perm::Harvest).unwrap());

    let stored = engine.repository().load_grants().unwrap();
    assert_eq!(
        stored,
        vec![GrantRecord {
            claim,
            actor: friend,
            permission: "harvest".into(),
        }]
    );
    assert!(matches!(
        engine.grant(claims_engine::claims::ClaimId::random(), friend, Perm::Build),
        Err(ClaimError::ClaimNotFound(_))
    ));
}
