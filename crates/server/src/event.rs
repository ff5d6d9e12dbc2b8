//! Game events the claim layer can veto.
//!
//! The set is closed: every kind a permission or rule can govern is listed
//! here, and the handler tables in `permissions` and `rules` match on it
//! exhaustively.

use claims_engine::access::WorldEvent;
use claims_engine::actors::ActorId;
use claims_engine::world::block::BlockId;
use claims_engine::world::position::{BlockPos, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // ── Player actions ──
    BlockBreak,
    BlockPlace,
    /// Right-click on a block (chest, door, lever, sign, ...).
    BlockInteract,
    BucketEmpty,
    BucketFill,
    FarmlandTrample,
    ItemFrameInteract,
    ArmorStandInteract,
    VehiclePlace,
    VehicleDestroy,
    VehicleEnter,
    VillagerTrade,
    AnimalDamage,
    /// Breeding, feeding, leashing, shearing.
    AnimalInteract,
    TntIgnite,
    BedEnter,
    PlayerDamage,

    // ── Environment ──
    MobGrief,
    Explosion,
    FireSpread,
    PistonPush,
    FluidFlow,

    // ── Not governed by anything ──
    Chat,
    Move,
}

/// One occurrence of an [`EventKind`].
///
/// Handlers mark it cancelled; whoever raised it reads `cancelled` back
/// after dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEvent {
    pub kind: EventKind,
    pub actor: Option<ActorId>,
    pub location: Option<Position>,
    /// The block acted on, if the event has one.
    pub block: Option<BlockId>,
    /// Positions an environmental event touches (blast radius, pushed
    /// blocks, flow target). Empty means just `location`.
    pub area: Vec<Position>,
    pub cancelled: bool,
}

impl GameEvent {
    /// An action a player takes at a block position.
    pub fn by_player(kind: EventKind, actor: ActorId, pos: BlockPos) -> Self {
        Self {
            kind,
            actor: Some(actor),
            location: Some(pos.into()),
            block: None,
            area: Vec::new(),
            cancelled: false,
        }
    }

    /// Something the world does on its own over a set of positions.
    pub fn environmental(kind: EventKind, area: impl IntoIterator<Item = BlockPos>) -> Self {
        let area: Vec<Position> = area.into_iter().map(Position::from).collect();
        Self {
            kind,
            actor: None,
            location: area.first().copied(),
            block: None,
            area,
            cancelled: false,
        }
    }

    pub fn with_block(mut self, block: BlockId) -> Self {
        self.block = Some(block);
        self
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// True when the event carries a block matching `test`.
    pub fn block_is(&self, test: impl Fn(BlockId) -> bool) -> bool {
        self.block.is_some_and(test)
    }
}

impl WorldEvent for GameEvent {
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
