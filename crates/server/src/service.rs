//! The claim service: one tokio task owning the engine.
//!
//! Connections talk to it through a [`ServiceHandle`] (an mpsc command
//! channel with oneshot replies) and through the player registry's
//! broadcast events. The task also runs the game tick that drives deferred
//! overlay refreshes, and publishes everything clients should see to the
//! [`EffectBus`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use claims_engine::actors::ActorId;
use claims_engine::claims::{Claim, ClaimId, Partition, PartitionId};
use claims_engine::engine::{ClaimEngine, Dispatch};
use claims_engine::error::ClaimError;
use claims_engine::world::World;
use claims_engine::world::position::Position;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::block::McBlocks;
use crate::dashboard::{self, DashboardState};
use crate::event::GameEvent;
use crate::event_bus::EffectBus;
use crate::permissions::PermissionKind;
use crate::player_registry::{PlayerEvent, PlayerRegistry};
use crate::rules::RuleKind;

pub type ServerEngine = ClaimEngine<PermissionKind, RuleKind, GameEvent>;

const COMMAND_CAPACITY: usize = 1024;

/// An event after both resolution paths ran over it.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub event: GameEvent,
    pub outcome: Dispatch<PermissionKind, RuleKind>,
}

impl Resolved {
    pub fn cancelled(&self) -> bool {
        self.event.cancelled
    }
}

/// What an unclaim removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unclaimed {
    Nothing,
    Partition(PartitionId),
    Claim(ClaimId),
}

/// Per-owner caps on claiming. `None` is unlimited.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimLimits {
    pub claims: Option<usize>,
    pub blocks: Option<i64>,
}

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command {
    Dispatch {
        event: GameEvent,
        reply: oneshot::Sender<Resolved>,
    },
    CreateClaim {
        owner: ActorId,
        name: String,
        first: Position,
        second: Position,
        reply: Reply<ClaimId>,
    },
    AddPartition {
        claim: ClaimId,
        first: Position,
        second: Position,
        reply: Reply<PartitionId>,
    },
    Unclaim {
        at: Position,
        connected: bool,
        reply: Reply<Unclaimed>,
    },
    SetGrant {
        claim: ClaimId,
        /// `None` targets the claim's default grants.
        actor: Option<ActorId>,
        permission: PermissionKind,
        granted: bool,
        reply: Reply<bool>,
    },
    SetRule {
        claim: ClaimId,
        rule: RuleKind,
        enabled: bool,
        reply: Reply<bool>,
    },
    SetOverride {
        actor: ActorId,
        enabled: bool,
        reply: oneshot::Sender<bool>,
    },
    ClaimAt {
        at: Position,
        reply: oneshot::Sender<Option<Claim>>,
    },
    Tick {
        reply: oneshot::Sender<usize>,
    },
}

pub struct ClaimService {
    engine: ServerEngine,
    players: Arc<PlayerRegistry>,
    world: Arc<World>,
    bus: EffectBus,
    dashboard: Arc<DashboardState>,
    limits: ClaimLimits,
}

impl ClaimService {
    pub fn new(
        engine: ServerEngine,
        players: Arc<PlayerRegistry>,
        world: Arc<World>,
        bus: EffectBus,
        dashboard: Arc<DashboardState>,
        limits: ClaimLimits,
    ) -> Self {
        Self {
            engine,
            players,
            world,
            bus,
            dashboard,
            limits,
        }
    }

    /// Move the service onto its own task, ticking every `tick`.
    ///
    /// The task stops once every [`ServiceHandle`] is dropped.
    pub fn spawn(self, tick: Duration) -> (ServiceHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        // Subscribe before spawning so no join is missed.
        let player_rx = self.players.subscribe();
        let task = tokio::spawn(self.run(rx, player_rx, tick));
        (ServiceHandle { tx }, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut player_rx: broadcast::Receiver<PlayerEvent>,
        tick: Duration,
    ) {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick fires immediately; skip it.
        interval.tick().await;

        self.publish_claims();
        tracing::info!("Claim service started (tick {:?})", tick);

        loop {
            // Player events first: a command sent after a registry update
            // must see that update.
            tokio::select! {
                biased;

                event = player_rx.recv() => match event {
                    Ok(event) => self.on_player_event(event),
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!("Claim service lagged behind by {} player events, resyncing", n);
                        self.resync_players();
                    }
                    Err(RecvError::Closed) => break,
                },

                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },

                _ = interval.tick() => {
                    self.tick();
                }
            }
        }
        tracing::info!("Claim service stopped");
    }

    fn on_player_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::Joined { actor, name } => {
                let returning = self.engine.actors().is_online(actor);
                self.engine.connect(actor, name);
                if !returning {
                    self.dashboard.metrics.player_joined();
                }
            }
            PlayerEvent::Left { actor } => {
                if self.engine.disconnect(actor).is_some() {
                    self.dashboard.metrics.player_left();
                }
            }
            PlayerEvent::ChunkChanged { actor, chunk } => self.engine.observer_moved(actor, chunk),
            PlayerEvent::HeldChanged { actor } => self.engine.request_visualisation(actor, false),
        }
    }

    /// Rebuild the actor table from the registry after missed player
    /// events. Events still buffered behind the gap replay harmlessly.
    fn resync_players(&mut self) {
        let present = self.players.online();
        let departed: Vec<ActorId> = self
            .engine
            .actors()
            .iter()
            .map(|(actor, _)| actor)
            .filter(|actor| !present.iter().any(|(p, _)| p == actor))
            .collect();
        for actor in departed {
            if self.engine.disconnect(actor).is_some() {
                self.dashboard.metrics.player_left();
            }
        }
        for (actor, name) in present {
            if !self.engine.actors().is_online(actor) {
                self.engine.connect(actor, name);
                self.dashboard.metrics.player_joined();
            }
            // Held-item changes may have been missed too.
            self.engine.request_visualisation(actor, false);
        }
    }

    fn handle(&mut self, command: Command) {
        // A dropped reply receiver means the caller gave up; nothing to do.
        match command {
            Command::Dispatch { event, reply } => {
                let _ = reply.send(self.dispatch(event));
            }
            Command::CreateClaim {
                owner,
                name,
                first,
                second,
                reply,
            } => {
                let _ = reply.send(self.create_claim(owner, name, first, second));
            }
            Command::AddPartition {
                claim,
                first,
                second,
                reply,
            } => {
                let _ = reply.send(self.add_partition(claim, first, second));
            }
            Command::Unclaim { at, connected, reply } => {
                let _ = reply.send(self.unclaim(at, connected));
            }
            Command::SetGrant {
                claim,
                actor,
                permission,
                granted,
                reply,
            } => {
                let result = match (actor, granted) {
                    (Some(actor), true) => self.engine.grant(claim, actor, permission),
                    (Some(actor), false) => self.engine.revoke(claim, actor, permission),
                    (None, true) => self.engine.grant_default(claim, permission),
                    (None, false) => self.engine.revoke_default(claim, permission),
                };
                if result.is_ok() {
                    self.publish_claims();
                }
                let _ = reply.send(result.map_err(Into::into));
            }
            Command::SetRule {
                claim,
                rule,
                enabled,
                reply,
            } => {
                let result = if enabled {
                    self.engine.enable_rule(claim, rule)
                } else {
                    self.engine.disable_rule(claim, rule)
                };
                if result.is_ok() {
                    self.publish_claims();
                }
                let _ = reply.send(result.map_err(Into::into));
            }
            Command::SetOverride { actor, enabled, reply } => {
                let _ = reply.send(self.engine.set_override(actor, enabled));
            }
            Command::ClaimAt { at, reply } => {
                let _ = reply.send(self.engine.registry().claim_at(&at).cloned());
            }
            Command::Tick { reply } => {
                let _ = reply.send(self.tick());
            }
        }
    }

    fn dispatch(&mut self, mut event: GameEvent) -> Resolved {
        let started = Instant::now();
        let outcome = self.engine.dispatch(&mut event, &mut self.bus);
        self.dashboard.metrics.record_dispatch(&outcome, started.elapsed());
        if outcome.blocked() {
            tracing::debug!("{:?} at {:?} blocked: {:?}", event.kind, event.location, outcome);
        }
        Resolved { event, outcome }
    }

    // ── Claiming ────────────────────────────────────────────────────────

    fn owned_blocks(&self, owner: ActorId) -> i64 {
        let registry = self.engine.registry();
        registry
            .claims_owned_by(owner)
            .iter()
            .map(|c| registry.block_count(c.id))
            .sum()
    }

    fn check_block_limit(&self, owner: ActorId, extra: i64) -> Result<()> {
        if let Some(limit) = self.limits.blocks {
            let owned = self.owned_blocks(owner);
            anyhow::ensure!(
                owned + extra <= limit,
                "claim block limit of {} reached ({} owned, {} requested)",
                limit,
                owned,
                extra
            );
        }
        Ok(())
    }

    fn create_claim(&mut self, owner: ActorId, name: String, first: Position, second: Position) -> Result<ClaimId> {
        if let Some(limit) = self.limits.claims {
            let owned = self.engine.registry().claims_owned_by(owner).len();
            anyhow::ensure!(owned < limit, "claim limit of {} reached", limit);
        }
        let claim = Claim::new(self.engine.world_id(), owner, first).named(name);
        let id = claim.id;
        let partition = Partition::new(id, first, second);
        self.check_block_limit(owner, partition.area().block_count())?;

        self.engine.create_claim(claim)?;
        if let Err(e) = self.furnish_claim(partition) {
            // A half-built claim is never left behind, in memory or on disk.
            if let Err(cleanup) = self.engine.remove_claim(id) {
                tracing::error!("Failed to roll back claim {}: {}", id, cleanup);
            }
            return Err(e.into());
        }

        self.dashboard.metrics.claim_created();
        self.publish_claims();
        Ok(id)
    }

    /// First partition and default rules of a freshly created claim.
    fn furnish_claim(&mut self, partition: Partition) -> Result<(), ClaimError> {
        let claim = partition.claim_id;
        self.engine.add_partition(partition)?;
        for rule in RuleKind::DEFAULTS {
            self.engine.enable_rule(claim, rule)?;
        }
        Ok(())
    }

    fn add_partition(&mut self, claim: ClaimId, first: Position, second: Position) -> Result<PartitionId> {
        let owner = self
            .engine
            .registry()
            .get(claim)
            .map(|c| c.owner)
            .ok_or_else(|| anyhow!("claim {} not found", claim))?;
        let partition = Partition::new(claim, first, second);
        self.check_block_limit(owner, partition.area().block_count())?;
        let id = self.engine.add_partition(partition)?;
        self.publish_claims();
        Ok(id)
    }

    fn unclaim(&mut self, at: Position, connected: bool) -> Result<Unclaimed> {
        let removed = if connected {
            self.engine
                .unclaim_connected_at(&at)?
                .map_or(Unclaimed::Nothing, |claim| Unclaimed::Claim(claim.id))
        } else {
            self.engine
                .unclaim_partition_at(&at)?
                .map_or(Unclaimed::Nothing, |partition| Unclaimed::Partition(partition.id))
        };
        if let Unclaimed::Claim(_) = removed {
            self.dashboard.metrics.claim_removed();
        }
        if removed != Unclaimed::Nothing {
            self.publish_claims();
        }
        Ok(removed)
    }

    // ── Tick ────────────────────────────────────────────────────────────

    /// Run due overlay refreshes and send each result to its player.
    /// Returns the number of players that received an overlay.
    fn tick(&mut self) -> usize {
        let out = self
            .engine
            .tick(self.players.as_ref(), self.world.as_ref(), &McBlocks);
        for (actor, instructions) in &out {
            self.dashboard.metrics.record_overlay(instructions.len());
            self.bus.publish_overlay(*actor, instructions);
        }
        out.len()
    }

    fn publish_claims(&self) {
        self.dashboard.publish_claims(dashboard::snapshot_claims(&self.engine));
    }
}

/// Cheap, cloneable access to the claim service.
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Command>,
}

impl ServiceHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| anyhow!("claim service stopped"))?;
        rx.await.context("claim service dropped the request")
    }

    /// Run an event through permissions and rules. Check `cancelled` on
    /// the returned event.
    pub async fn dispatch(&self, event: GameEvent) -> Result<Resolved> {
        self.request(|reply| Command::Dispatch { event, reply }).await
    }

    /// Create a claim for `owner` whose first partition spans the two
    /// corners. New claims start with the default rules enabled.
    pub async fn create_claim(
        &self,
        owner: ActorId,
        name: impl Into<String>,
        first: Position,
        second: Position,
    ) -> Result<ClaimId> {
        let name = name.into();
        self.request(|reply| Command::CreateClaim {
            owner,
            name,
            first,
            second,
            reply,
        })
        .await?
    }

    pub async fn add_partition(&self, claim: ClaimId, first: Position, second: Position) -> Result<PartitionId> {
        self.request(|reply| Command::AddPartition {
            claim,
            first,
            second,
            reply,
        })
        .await?
    }

    /// Remove the partition at `at`, or with `connected` the whole claim.
    pub async fn unclaim(&self, at: Position, connected: bool) -> Result<Unclaimed> {
        self.request(|reply| Command::Unclaim { at, connected, reply }).await?
    }

    async fn set_grant(
        &self,
        claim: ClaimId,
        actor: Option<ActorId>,
        permission: PermissionKind,
        granted: bool,
    ) -> Result<bool> {
        self.request(|reply| Command::SetGrant {
            claim,
            actor,
            permission,
            granted,
            reply,
        })
        .await?
    }

    pub async fn grant(&self, claim: ClaimId, actor: ActorId, permission: PermissionKind) -> Result<bool> {
        self.set_grant(claim, Some(actor), permission, true).await
    }

    pub async fn revoke(&self, claim: ClaimId, actor: ActorId, permission: PermissionKind) -> Result<bool> {
        self.set_grant(claim, Some(actor), permission, false).await
    }

    pub async fn grant_default(&self, claim: ClaimId, permission: PermissionKind) -> Result<bool> {
        self.set_grant(claim, None, permission, true).await
    }

    pub async fn revoke_default(&self, claim: ClaimId, permission: PermissionKind) -> Result<bool> {
        self.set_grant(claim, None, permission, false).await
    }

    pub async fn enable_rule(&self, claim: ClaimId, rule: RuleKind) -> Result<bool> {
        self.request(|reply| Command::SetRule {
            claim,
            rule,
            enabled: true,
            reply,
        })
        .await?
    }

    pub async fn disable_rule(&self, claim: ClaimId, rule: RuleKind) -> Result<bool> {
        self.request(|reply| Command::SetRule {
            claim,
            rule,
            enabled: false,
            reply,
        })
        .await?
    }

    /// False if the actor is not online.
    pub async fn set_override(&self, actor: ActorId, enabled: bool) -> Result<bool> {
        self.request(|reply| Command::SetOverride { actor, enabled, reply }).await
    }

    pub async fn claim_at(&self, at: Position) -> Result<Option<Claim>> {
        self.request(|reply| Command::ClaimAt { at, reply }).await
    }

    /// Run one tick now instead of waiting for the timer.
    pub async fn tick(&self) -> Result<usize> {
        self.request(|reply| Command::Tick { reply }).await
    }
}
