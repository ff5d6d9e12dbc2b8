//! The claim engine: every table for one world plus the two static graphs,
//! behind a single owner.
//!
//! Nothing in here is shared or locked. The server runs one engine on one
//! task and serialises access through a command channel.

use uuid::Uuid;

use crate::access::grants::{GrantTable, RuleTable};
use crate::access::graph::Kind;
use crate::access::resolver::{
    self, Notifier, PermissionContext, PermissionGraph, RuleContext, RuleGraph, RuleVerdict, Verdict, WorldEvent,
};
use crate::actors::{ActorId, ActorState, ActorTable};
use crate::claims::{Claim, ClaimId, ClaimRegistry, Partition, PartitionId};
use crate::config::EngineConfig;
use crate::error::ClaimError;
use crate::repository::{ClaimRepository, DefaultGrantRecord, GrantRecord, RuleRecord};
use crate::tick::TickQueue;
use crate::visualiser::{self, BlockClassifier, ObserverLookup, OverlayInstruction, OverlayScene};
use crate::world::position::{ChunkPos, Position};
use crate::world::BlockView;

/// Outcome of running an event through both resolution paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch<P, R> {
    pub permission: Verdict<P>,
    pub rule: RuleVerdict<R>,
}

impl<P, R> Dispatch<P, R> {
    /// True if either path stopped the event.
    pub fn blocked(&self) -> bool {
        self.permission.is_denied() || !self.rule.is_allowed()
    }
}

/// A visualisation refresh waiting for the next tick.
#[derive(Debug, Clone, Copy)]
struct Refresh {
    actor: ActorId,
    force: bool,
}

pub struct ClaimEngine<P: Kind, R: Kind, Ev: WorldEvent> {
    config: EngineConfig,
    world_id: Uuid,
    registry: ClaimRegistry,
    grants: GrantTable<P>,
    rules: RuleTable<R>,
    actors: ActorTable,
    permissions: PermissionGraph<P, Ev>,
    rule_graph: RuleGraph<R, Ev>,
    repo: Box<dyn ClaimRepository>,
    ticks: TickQueue<Refresh>,
}

impl<P: Kind, R: Kind, Ev: WorldEvent> ClaimEngine<P, R, Ev> {
    /// Seed an engine for `world_id` from the repository.
    ///
    /// Grant and rule records naming an identifier the graphs do not know
    /// are skipped with a warning; corrupt claim/partition data fails.
    pub fn load(
        config: EngineConfig,
        world_id: Uuid,
        repo: Box<dyn ClaimRepository>,
        permissions: PermissionGraph<P, Ev>,
        rule_graph: RuleGraph<R, Ev>,
    ) -> Result<Self, ClaimError> {
        let registry = ClaimRegistry::load(repo.as_ref(), world_id)?;

        let mut grants = GrantTable::new();
        for record in repo.load_grants()? {
            if !registry.contains(record.claim) {
                continue;
            }
            match permissions.by_identifier(&record.permission) {
                Some(kind) => {
                    grants.grant(record.claim, record.actor, kind);
                }
                None => tracing::warn!("Skipping grant of unknown permission '{}'", record.permission),
            }
        }
        for record in repo.load_default_grants()? {
            if !registry.contains(record.claim) {
                continue;
            }
            match permissions.by_identifier(&record.permission) {
                Some(kind) => {
                    grants.grant_default(record.claim, kind);
                }
                None => tracing::warn!("Skipping default grant of unknown permission '{}'", record.permission),
            }
        }

        let mut rules = RuleTable::new();
        for record in repo.load_rules()? {
            if !registry.contains(record.claim) {
                continue;
            }
            match rule_graph.by_identifier(&record.rule) {
                Some(kind) => {
                    rules.enable(record.claim, kind);
                }
                None => tracing::warn!("Skipping unknown rule '{}'", record.rule),
            }
        }

        tracing::info!(
            "Claim engine ready: {} permission kinds, {} rule kinds, rule mode {}",
            permissions.len(),
            rule_graph.len(),
            config.rule_enforcement
        );
        Ok(Self {
            config,
            world_id,
            registry,
            grants,
            rules,
            actors: ActorTable::new(),
            permissions,
            rule_graph,
            repo,
            ticks: TickQueue::new(),
        })
    }

    // ── Resolution ──────────────────────────────────────────────────────

    pub fn check_permission(&self, event: &mut Ev, notifier: &mut dyn Notifier) -> Verdict<P> {
        let ctx = PermissionContext {
            registry: &self.registry,
            graph: &self.permissions,
            grants: &self.grants,
            actors: &self.actors,
        };
        resolver::resolve_permission(&ctx, event, notifier)
    }

    pub fn check_rule(&self, event: &mut Ev) -> RuleVerdict<R> {
        let ctx = RuleContext {
            registry: &self.registry,
            graph: &self.rule_graph,
            rules: &self.rules,
            mode: self.config.rule_enforcement,
        };
        resolver::resolve_rule(&ctx, event)
    }

    /// Run both paths. They are independent: a permission denial does not
    /// skip the rule check.
    pub fn dispatch(&self, event: &mut Ev, notifier: &mut dyn Notifier) -> Dispatch<P, R> {
        let permission = self.check_permission(event, notifier);
        let rule = self.check_rule(event);
        Dispatch { permission, rule }
    }

    // ── Claims ──────────────────────────────────────────────────────────

    pub fn create_claim(&mut self, claim: Claim) -> Result<ClaimId, ClaimError> {
        let id = claim.id;
        self.registry.add_claim(self.repo.as_mut(), claim)?;
        tracing::info!("Claim {} created in world {}", id, self.world_id);
        Ok(id)
    }

    pub fn add_partition(&mut self, partition: Partition) -> Result<PartitionId, ClaimError> {
        let id = partition.id;
        self.registry.add_partition(self.repo.as_mut(), partition)?;
        self.refresh_visualising();
        Ok(id)
    }

    /// Remove one partition. The claim survives even with no partitions.
    pub fn remove_partition(&mut self, id: PartitionId) -> Result<Partition, ClaimError> {
        let partition = self.registry.remove_partition(self.repo.as_mut(), id)?;
        self.refresh_visualising();
        Ok(partition)
    }

    /// Remove a claim, its partitions, grants and rules.
    pub fn remove_claim(&mut self, id: ClaimId) -> Result<Claim, ClaimError> {
        let claim = self.registry.remove_claim(self.repo.as_mut(), id)?;
        self.grants.forget_claim(id);
        self.rules.forget_claim(id);
        self.refresh_visualising();
        tracing::info!("Claim {} '{}' removed", id, claim.name);
        Ok(claim)
    }

    /// Unclaim the partition standing at `pos`. `Ok(None)` if there is none.
    pub fn unclaim_partition_at(&mut self, pos: &Position) -> Result<Option<Partition>, ClaimError> {
        let Some(id) = self.registry.partitions().find_containing(pos).map(|p| p.id) else {
            return Ok(None);
        };
        self.remove_partition(id).map(Some)
    }

    /// Unclaim the whole claim owning the partition at `pos`.
    pub fn unclaim_connected_at(&mut self, pos: &Position) -> Result<Option<Claim>, ClaimError> {
        let Some(id) = self.registry.claim_at(pos).map(|c| c.id) else {
            return Ok(None);
        };
        self.remove_claim(id).map(Some)
    }

    // ── Grants and rules ────────────────────────────────────────────────

    fn permission_identifier(&self, kind: P) -> Result<String, ClaimError> {
        self.permissions
            .identifier_of(kind)
            .map(str::to_owned)
            .ok_or_else(|| ClaimError::UnknownKind(format!("{kind:?}")))
    }

    fn rule_identifier(&self, kind: R) -> Result<String, ClaimError> {
        self.rule_graph
            .identifier_of(kind)
            .map(str::to_owned)
            .ok_or_else(|| ClaimError::UnknownKind(format!("{kind:?}")))
    }

    fn require_claim(&self, claim: ClaimId) -> Result<(), ClaimError> {
        if self.registry.contains(claim) {
            Ok(())
        } else {
            Err(ClaimError::ClaimNotFound(claim))
        }
    }

    /// Returns false if the actor already held the grant.
    pub fn grant(&mut self, claim: ClaimId, actor: ActorId, kind: P) -> Result<bool, ClaimError> {
        self.require_claim(claim)?;
        let permission = self.permission_identifier(kind)?;
        self.repo.save_grant(&GrantRecord { claim, actor, permission })?;
        Ok(self.grants.grant(claim, actor, kind))
    }

    pub fn revoke(&mut self, claim: ClaimId, actor: ActorId, kind: P) -> Result<bool, ClaimError> {
        self.require_claim(claim)?;
        let permission = self.permission_identifier(kind)?;
        self.repo.delete_grant(&GrantRecord { claim, actor, permission })?;
        Ok(self.grants.revoke(claim, actor, kind))
    }

    pub fn grant_default(&mut self, claim: ClaimId, kind: P) -> Result<bool, ClaimError> {
        self.require_claim(claim)?;
        let permission = self.permission_identifier(kind)?;
        self.repo.save_default_grant(&DefaultGrantRecord { claim, permission })?;
        Ok(self.grants.grant_default(claim, kind))
    }

    pub fn revoke_default(&mut self, claim: ClaimId, kind: P) -> Result<bool, ClaimError> {
        self.require_claim(claim)?;
        let permission = self.permission_identifier(kind)?;
        self.repo.delete_default_grant(&DefaultGrantRecord { claim, permission })?;
        Ok(self.grants.revoke_default(claim, kind))
    }

    pub fn enable_rule(&mut self, claim: ClaimId, kind: R) -> Result<bool, ClaimError> {
        self.require_claim(claim)?;
        let rule = self.rule_identifier(kind)?;
        self.repo.save_rule(&RuleRecord { claim, rule })?;
        Ok(self.rules.enable(claim, kind))
    }

    pub fn disable_rule(&mut self, claim: ClaimId, kind: R) -> Result<bool, ClaimError> {
        self.require_claim(claim)?;
        let rule = self.rule_identifier(kind)?;
        self.repo.delete_rule(&RuleRecord { claim, rule })?;
        Ok(self.rules.disable(claim, kind))
    }

    // ── Actors ──────────────────────────────────────────────────────────

    pub fn connect(&mut self, actor: ActorId, name: impl Into<String>) {
        let name = name.into();
        tracing::debug!("{} ({}) connected", name, actor);
        self.actors.connect(actor, name);
    }

    pub fn disconnect(&mut self, actor: ActorId) -> Option<ActorState> {
        self.actors.disconnect(actor)
    }

    /// Returns false if the actor is not connected.
    pub fn set_override(&mut self, actor: ActorId, enabled: bool) -> bool {
        let applied = self.actors.set_override(actor, enabled);
        if applied {
            tracing::info!("Override {} for {}", if enabled { "enabled" } else { "disabled" }, actor);
        }
        applied
    }

    pub fn remember_name(&mut self, actor: ActorId, name: impl Into<String>) {
        self.actors.remember_name(actor, name);
    }

    // ── Visualisation ───────────────────────────────────────────────────

    /// Queue an overlay refresh for the next tick. Several requests for the
    /// same actor within one tick collapse into one; any forced request
    /// makes the merged one forced.
    pub fn request_visualisation(&mut self, actor: ActorId, force: bool) {
        if let Some(pending) = self.ticks.pending_mut().find(|r| r.actor == actor) {
            pending.force |= force;
            return;
        }
        self.ticks.schedule_next(Refresh { actor, force });
    }

    /// Movement hook: entering a new chunk while visualising refreshes the
    /// overlay so borders coming into range appear.
    pub fn observer_moved(&mut self, actor: ActorId, chunk: ChunkPos) {
        let moved = self
            .actors
            .get(actor)
            .is_some_and(|s| s.visualizing && s.last_chunk != Some(chunk));
        if moved {
            self.request_visualisation(actor, true);
        }
    }

    fn refresh_visualising(&mut self) {
        let visualising: Vec<ActorId> = self
            .actors
            .iter()
            .filter(|(_, state)| state.visualizing)
            .map(|(actor, _)| actor)
            .collect();
        for actor in visualising {
            self.request_visualisation(actor, true);
        }
    }

    /// Advance one tick and run the refreshes that came due.
    ///
    /// Actors that disconnected or can no longer be observed are skipped.
    pub fn tick(
        &mut self,
        observers: &dyn ObserverLookup,
        blocks: &dyn BlockView,
        classifier: &dyn BlockClassifier,
    ) -> Vec<(ActorId, Vec<OverlayInstruction>)> {
        let due = self.ticks.advance();
        if due.is_empty() {
            return Vec::new();
        }
        let scene = OverlayScene {
            store: self.registry.partitions(),
            blocks,
            classifier,
            radius: self.config.view_radius,
            y_range: self.config.y_range,
        };

        let mut out = Vec::new();
        for refresh in due {
            let Some(observer) = observers.observer(refresh.actor) else {
                continue;
            };
            let Some(state) = self.actors.get_mut(refresh.actor) else {
                continue;
            };
            let instructions = visualiser::update_visualisation(state, &observer, refresh.force, &scene);
            if !instructions.is_empty() {
                out.push((refresh.actor, instructions));
            }
        }
        out
    }

    pub fn pending_refreshes(&self) -> usize {
        self.ticks.len()
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn world_id(&self) -> Uuid {
        self.world_id
    }

    pub fn registry(&self) -> &ClaimRegistry {
        &self.registry
    }

    pub fn grants(&self) -> &GrantTable<P> {
        &self.grants
    }

    pub fn rules(&self) -> &RuleTable<R> {
        &self.rules
    }

    pub fn actors(&self) -> &ActorTable {
        &self.actors
    }

    pub fn permissions(&self) -> &PermissionGraph<P, Ev> {
        &self.permissions
    }

    pub fn rule_graph(&self) -> &RuleGraph<R, Ev> {
        &self.rule_graph
    }

    pub fn repository(&self) -> &dyn ClaimRepository {
        self.repo.as_ref()
    }
}
