//! Shared registry of online players.
//!
//! Tracks where each connected player stands and what they hold, and
//! broadcasts lifecycle events so the claim service can keep its actor
//! table, refresh-on-move and tool toggles in step with the connections.

use std::collections::HashMap;
use std::sync::RwLock;

use azalea_registry::builtin::ItemKind;
use claims_engine::actors::ActorId;
use claims_engine::visualiser::{Observer, ObserverLookup};
use claims_engine::world::position::{BlockPos, ChunkPos};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Holding this in either hand shows claim borders.
pub const CLAIM_TOOL: ItemKind = ItemKind::Stick;

/// Information about a connected player, stored in the registry.
#[derive(Clone, Debug)]
pub struct PlayerInfo {
    pub actor: ActorId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub main_hand: ItemKind,
    pub off_hand: ItemKind,
}

impl PlayerInfo {
    pub fn new(actor: ActorId, name: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            actor,
            name: name.into(),
            x,
            y,
            z,
            main_hand: ItemKind::Air,
            off_hand: ItemKind::Air,
        }
    }

    pub fn feet(&self) -> BlockPos {
        BlockPos::new(self.x.floor() as i64, self.y.floor() as i64, self.z.floor() as i64)
    }

    pub fn holding_claim_tool(&self) -> bool {
        self.main_hand == CLAIM_TOOL || self.off_hand == CLAIM_TOOL
    }
}

/// Lifecycle events broadcast to subscribers.
#[derive(Clone, Debug)]
pub enum PlayerEvent {
    Joined { actor: ActorId, name: String },
    Left { actor: ActorId },
    /// Only sent when the player crosses into another chunk column.
    ChunkChanged { actor: ActorId, chunk: ChunkPos },
    /// Held items changed: hotbar switch, pickup, drop, inventory click.
    HeldChanged { actor: ActorId },
}

/// Thread-safe registry of all connected players.
///
/// Uses `std::sync::RwLock` because every operation is brief (no awaits while
/// the lock is held) and the access pattern is read-heavy.
pub struct PlayerRegistry {
    players: RwLock<HashMap<ActorId, PlayerInfo>>,
    event_tx: broadcast::Sender<PlayerEvent>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        // Movement only produces an event on chunk crossings, so this is
        // plenty even with many players.
        let (event_tx, _) = broadcast::channel(512);
        Self {
            players: RwLock::new(HashMap::new()),
            event_tx,
        }
    }

    /// Register a player and broadcast `PlayerEvent::Joined`.
    pub fn register(&self, info: PlayerInfo) {
        let event = PlayerEvent::Joined {
            actor: info.actor,
            name: info.name.clone(),
        };
        self.players
            .write()
            .expect("player registry poisoned")
            .insert(info.actor, info);
        // Best-effort: if no subscribers yet, the send fails silently.
        let _ = self.event_tx.send(event);
    }

    /// Update a player's position, broadcasting `PlayerEvent::ChunkChanged`
    /// when they entered a new chunk column.
    pub fn update_position(&self, actor: ActorId, x: f64, y: f64, z: f64) {
        let crossed = {
            let mut players = self.players.write().expect("player registry poisoned");
            let Some(info) = players.get_mut(&actor) else {
                return;
            };
            let before = info.feet().chunk();
            info.x = x;
            info.y = y;
            info.z = z;
            let after = info.feet().chunk();
            (before != after).then_some(after)
        };
        if let Some(chunk) = crossed {
            let _ = self.event_tx.send(PlayerEvent::ChunkChanged { actor, chunk });
        }
    }

    /// Update held items, broadcasting `PlayerEvent::HeldChanged` if either
    /// hand changed.
    pub fn update_held(&self, actor: ActorId, main_hand: ItemKind, off_hand: ItemKind) {
        let changed = {
            let mut players = self.players.write().expect("player registry poisoned");
            let Some(info) = players.get_mut(&actor) else {
                return;
            };
            let changed = info.main_hand != main_hand || info.off_hand != off_hand;
            info.main_hand = main_hand;
            info.off_hand = off_hand;
            changed
        };
        if changed {
            let _ = self.event_tx.send(PlayerEvent::HeldChanged { actor });
        }
    }

    /// Remove a player and broadcast `PlayerEvent::Left`.
    pub fn deregister(&self, actor: ActorId) {
        let removed = self
            .players
            .write()
            .expect("player registry poisoned")
            .remove(&actor);
        if removed.is_some() {
            let _ = self.event_tx.send(PlayerEvent::Left { actor });
        }
    }

    pub fn get(&self, actor: ActorId) -> Option<PlayerInfo> {
        self.players
            .read()
            .expect("player registry poisoned")
            .get(&actor)
            .cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Option<PlayerInfo> {
        self.players
            .read()
            .expect("player registry poisoned")
            .values()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Everyone currently registered, by id and name.
    pub fn online(&self) -> Vec<(ActorId, String)> {
        self.players
            .read()
            .expect("player registry poisoned")
            .values()
            .map(|p| (p.actor, p.name.clone()))
            .collect()
    }

    pub fn player_count(&self) -> usize {
        self.players.read().expect("player registry poisoned").len()
    }

    /// Subscribe to player lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverLookup for PlayerRegistry {
    fn observer(&self, actor: ActorId) -> Option<Observer> {
        self.get(actor).map(|info| Observer {
            actor,
            feet: info.feet(),
            holding_tool: info.holding_claim_tool(),
        })
    }
}

/// Offline-mode player UUID, derived from the name the way vanilla does it.
pub fn offline_uuid(name: &str) -> Uuid {
    Uuid::new_v3(&Uuid::NAMESPACE_URL, format!("OfflinePlayer:{}", name).as_bytes())
}
