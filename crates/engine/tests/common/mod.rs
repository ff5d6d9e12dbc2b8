//! A minimal game layer for driving the engine from tests.
#![allow(dead_code)]

use claims_engine::access::{PermissionFn, PermissionGraph, RuleFn, RuleGraph, WorldEvent};
use claims_engine::actors::ActorId;
use claims_engine::claims::{Claim, ClaimId, Partition};
use claims_engine::config::{EngineConfig, RuleEnforcement};
use claims_engine::engine::ClaimEngine;
use claims_engine::repository::MemoryRepository;
use claims_engine::world::position::Position;
use uuid::Uuid;

pub const WORLD: Uuid = Uuid::from_u128(0x5eed);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Perm {
    Build,
    Harvest,
    Container,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Explosions,
    Fluids,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BlockBreak,
    CropBreak,
    ChestOpen,
    Explode,
    FluidFlow,
    Chat,
}

#[derive(Debug, Clone)]
pub struct TestEvent {
    pub kind: EventKind,
    pub actor: Option<ActorId>,
    pub location: Option<Position>,
    pub area: Vec<Position>,
    pub cancelled: bool,
    /// Number of handler invocations.
    pub handled: u32,
}

impl TestEvent {
    pub fn at(kind: EventKind, actor: ActorId, x: i64, z: i64) -> Self {
        Self {
            kind,
            actor: Some(actor),
            location: Some(Position::new(x, 64, z)),
            area: Vec::new(),
            cancelled: false,
            handled: 0,
        }
    }

    /// An actorless event touching several positions (an explosion).
    pub fn spread(kind: EventKind, area: Vec<Position>) -> Self {
        Self {
            kind,
            actor: None,
            location: area.first().copied(),
            area,
            cancelled: false,
            handled: 0,
        }
    }
}

impl WorldEvent for TestEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        self.kind
    }

    fn actor(&self) -> Option<ActorId> {
        self.actor
    }

    fn location(&self) -> Option<Position> {
        self.location
    }

    fn affected_area(&self) -> Vec<Position> {
        if self.area.is_empty() {
            self.location.into_iter().collect()
        } else {
            self.area.clone()
        }
    }
}

fn cancel(event: &mut TestEvent) -> bool {
    event.handled += 1;
    event.cancelled = true;
    true
}

/// A handler that decides this case needs no action.
fn pass(event: &mut TestEvent) -> bool {
    event.handled += 1;
    false
}

fn suppress(event: &mut TestEvent) {
    event.handled += 1;
    event.cancelled = true;
}

pub type Engine = ClaimEngine<Perm, Rule, TestEvent>;

/// Build governs block breaks. Crop breaks are governed by Build (which
/// lets them through) and then Harvest, a child of Build.
pub fn permissions() -> PermissionGraph<Perm, TestEvent> {
    let cancel: PermissionFn<TestEvent> = cancel;
    let pass: PermissionFn<TestEvent> = pass;

    let mut g = PermissionGraph::<Perm, TestEvent>::new();
    g.register(
        Perm::Build,
        "build",
        "b",
        None,
        [(EventKind::BlockBreak, cancel), (EventKind::CropBreak, pass)],
    )
    .unwrap();
    g.register(Perm::Harvest, "harvest", "h", Some(Perm::Build), [(EventKind::CropBreak, cancel)])
        .unwrap();
    g.register(Perm::Container, "container", "c", None, [(EventKind::ChestOpen, cancel)])
        .unwrap();
    g
}

pub fn rules() -> RuleGraph<Rule, TestEvent> {
    let suppress: RuleFn<TestEvent> = suppress;

    let mut g = RuleGraph::<Rule, TestEvent>::new();
    g.register(Rule::Explosions, "explosions", "tnt", None, [(EventKind::Explode, suppress)])
        .unwrap();
    g.register(Rule::Fluids, "fluids", "water", None, [(EventKind::FluidFlow, suppress)])
        .unwrap();
    g
}

pub fn engine_with(repo: MemoryRepository, mode: RuleEnforcement) -> Engine {
    let config = EngineConfig {
        view_radius: 1,
        y_range: 4,
        rule_enforcement: mode,
    };
    ClaimEngine::load(config, WORLD, Box::new(repo), permissions(), rules()).unwrap()
}

pub fn engine() -> Engine {
    engine_with(MemoryRepository::new(), RuleEnforcement::FirstLacking)
}

/// Create a claim for `owner` with one rectangular partition.
pub fn claim_rect(engine: &mut Engine, owner: ActorId, x1: i64, z1: i64, x2: i64, z2: i64) -> ClaimId {
    let claim = Claim::new(WORLD, owner, Position::flat(x1, z1)).named("test claim");
    let id = engine.create_claim(claim).unwrap();
    engine
        .add_partition(Partition::new(id, Position::flat(x1, z1), Position::flat(x2, z2)))
        .unwrap();
    id
}
