//! Decides whether a world event may proceed inside claimed land.
//!
//! Two independent paths: the permission path asks "may this actor do this
//! here?", the rule path asks "does every claim this event touches allow
//! it at all?". Neither path fails for missing claims or grants; absence is
//! an allow.

use std::hash::Hash;

use super::grants::{GrantTable, RuleTable};
use super::graph::{Kind, KindGraph};
use crate::actors::{ActorId, ActorTable};
use crate::claims::{ClaimId, ClaimRegistry};
use crate::config::RuleEnforcement;
use crate::world::position::Position;

/// What the resolver needs to know about an inbound event.
pub trait WorldEvent {
    type Kind: Copy + Eq + Hash;

    fn kind(&self) -> Self::Kind;
    fn actor(&self) -> Option<ActorId>;
    fn location(&self) -> Option<Position>;

    /// Every position the event touches. Most events touch one block.
    fn affected_area(&self) -> Vec<Position> {
        self.location().into_iter().collect()
    }
}

/// Suppressing handler on the permission path. Returns true if it cancelled
/// the event, false if this particular case needs no action.
pub type PermissionFn<Ev> = fn(&mut Ev) -> bool;

/// Suppressing handler on the rule path.
pub type RuleFn<Ev> = fn(&mut Ev);

pub type PermissionGraph<K, Ev> = KindGraph<K, <Ev as WorldEvent>::Kind, PermissionFn<Ev>>;
pub type RuleGraph<K, Ev> = KindGraph<K, <Ev as WorldEvent>::Kind, RuleFn<Ev>>;

/// A denial the actor should hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenialNotice {
    pub actor: ActorId,
    pub claim: ClaimId,
    pub owner: ActorId,
    pub owner_name: String,
}

impl DenialNotice {
    pub fn message(&self) -> String {
        format!("You can't do that in {}'s claim!", self.owner_name)
    }
}

/// Delivery of denial messages. The engine never talks to clients itself.
pub trait Notifier {
    fn deny(&mut self, notice: DenialNotice);
}

impl Notifier for Vec<DenialNotice> {
    fn deny(&mut self, notice: DenialNotice) {
        self.push(notice);
    }
}

/// Why an event was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allowance {
    /// No actor or no location: nothing to check.
    OutOfScope,
    /// No claim at the event's position(s).
    Unclaimed,
    Override,
    Owner,
    /// No kind governs this event kind.
    Ungoverned,
    /// The actor's effective grants cover every governing kind.
    Granted,
    /// Handlers ran but none of them suppressed the event.
    NoAction,
    /// Every affected claim has the governing rule enabled.
    RuleEnabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict<K> {
    Allowed(Allowance),
    Denied { claim: ClaimId, kind: K },
}

impl<K> Verdict<K> {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed(_))
    }

    pub fn is_denied(&self) -> bool {
        !self.is_allowed()
    }
}

/// Result of the rule path.
///
/// `checked` counts the claims whose rule table was consulted, so callers
/// can see where [`RuleEnforcement::FirstLacking`] stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleVerdict<K> {
    Allowed(Allowance),
    Suppressed {
        kind: K,
        lacking: Vec<ClaimId>,
        checked: usize,
    },
}

impl<K> RuleVerdict<K> {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RuleVerdict::Allowed(_))
    }
}

/// Tables the permission path reads.
pub struct PermissionContext<'a, K, Ev: WorldEvent> {
    pub registry: &'a ClaimRegistry,
    pub graph: &'a PermissionGraph<K, Ev>,
    pub grants: &'a GrantTable<K>,
    pub actors: &'a ActorTable,
}

pub fn resolve_permission<K: Kind, Ev: WorldEvent>(
    ctx: &PermissionContext<'_, K, Ev>,
    event: &mut Ev,
    notifier: &mut dyn Notifier,
) -> Verdict<K> {
    let (Some(actor), Some(location)) = (event.actor(), event.location()) else {
        return Verdict::Allowed(Allowance::OutOfScope);
    };
    let Some(partition) = ctx.registry.partitions().find_containing(&location) else {
        return Verdict::Allowed(Allowance::Unclaimed);
    };
    let Some(claim) = ctx.registry.get(partition.claim_id) else {
        // Store and registry are kept in step; a miss here is a bug upstream.
        tracing::error!("Partition {} has no claim {}", partition.id, partition.claim_id);
        return Verdict::Allowed(Allowance::Unclaimed);
    };
    if ctx.actors.has_override(actor) {
        return Verdict::Allowed(Allowance::Override);
    }
    if claim.owner == actor {
        return Verdict::Allowed(Allowance::Owner);
    }

    let event_kind = event.kind();
    if !ctx.graph.governs(event_kind) {
        return Verdict::Allowed(Allowance::Ungoverned);
    }

    let held = ctx.grants.effective(claim.id, actor);
    let satisfied = |kind: K| held.is_some_and(|set| ctx.graph.is_satisfied(kind, set));
    if ctx.graph.governing(event_kind).all(satisfied) {
        return Verdict::Allowed(Allowance::Granted);
    }

    for kind in ctx.graph.governing(event_kind) {
        if satisfied(kind) {
            continue;
        }
        let Some(handler) = ctx.graph.executor_for(event_kind, kind) else {
            continue;
        };
        if handler(event) {
            let owner_name = ctx
                .actors
                .name_of(claim.owner)
                .map(str::to_owned)
                .unwrap_or_else(|| claim.owner.to_string());
            tracing::debug!("{} denied {:?} in claim {}", actor, kind, claim.id);
            notifier.deny(DenialNotice {
                actor,
                claim: claim.id,
                owner: claim.owner,
                owner_name,
            });
            return Verdict::Denied { claim: claim.id, kind };
        }
    }
    Verdict::Allowed(Allowance::NoAction)
}

/// Tables the rule path reads.
pub struct RuleContext<'a, K, Ev: WorldEvent> {
    pub registry: &'a ClaimRegistry,
    pub graph: &'a RuleGraph<K, Ev>,
    pub rules: &'a RuleTable<K>,
    pub mode: RuleEnforcement,
}

pub fn resolve_rule<K: Kind, Ev: WorldEvent>(ctx: &RuleContext<'_, K, Ev>, event: &mut Ev) -> RuleVerdict<K> {
    let event_kind = event.kind();
    let Some(kind) = ctx.graph.first_governing(event_kind) else {
        return RuleVerdict::Allowed(Allowance::Ungoverned);
    };
    let area = event.affected_area();
    let claims = ctx.registry.partitions().claims_at(&area);
    if claims.is_empty() {
        return RuleVerdict::Allowed(Allowance::Unclaimed);
    }

    let mut lacking = Vec::new();
    let mut checked = 0;
    for claim in &claims {
        checked += 1;
        if ctx.rules.has_rule(*claim, kind) {
            continue;
        }
        lacking.push(*claim);
        if ctx.mode == RuleEnforcement::FirstLacking {
            break;
        }
    }
    if lacking.is_empty() {
        return RuleVerdict::Allowed(Allowance::RuleEnabled);
    }

    if let Some(handler) = ctx.graph.executor_for(event_kind, kind) {
        handler(event);
    }
    tracing::debug!("{:?} suppressed by {} of {} affected claims", kind, lacking.len(), claims.len());
    RuleVerdict::Suppressed { kind, lacking, checked }
}
