//! Per-actor ephemeral state, keyed by a stable actor id.
//!
//! State is created when an actor connects and dropped when it disconnects;
//! nothing here is persisted. Display names outlive the session so denial
//! messages can still name an offline claim owner.

use std::collections::{HashMap, HashSet};
use std::fmt;

use uuid::Uuid;

use crate::claims::ClaimId;
use crate::world::position::{BlockPos, ChunkPos};

/// Stable identifier of an actor (a player's profile UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub Uuid);

impl ActorId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Default, Clone)]
pub struct ActorState {
    /// Operator mode: bypasses every permission check while set.
    pub override_enabled: bool,
    /// Whether border overlays are currently shown to this actor.
    pub visualizing: bool,
    /// Cells currently overlaid for this actor, grouped by owning claim.
    pub visualised: HashMap<ClaimId, HashSet<BlockPos>>,
    /// Chunk the actor was last seen in, for refresh-on-move.
    pub last_chunk: Option<ChunkPos>,
}

impl ActorState {
    pub fn overlay_count(&self) -> usize {
        self.visualised.values().map(|cells| cells.len()).sum()
    }
}

#[derive(Default)]
pub struct ActorTable {
    online: HashMap<ActorId, ActorState>,
    names: HashMap<ActorId, String>,
}

impl ActorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh session. Reconnecting resets any stale state.
    pub fn connect(&mut self, actor: ActorId, name: impl Into<String>) -> &mut ActorState {
        self.names.insert(actor, name.into());
        let state = self.online.entry(actor).or_default();
        *state = ActorState::default();
        state
    }

    pub fn disconnect(&mut self, actor: ActorId) -> Option<ActorState> {
        self.online.remove(&actor)
    }

    pub fn get(&self, actor: ActorId) -> Option<&ActorState> {
        self.online.get(&actor)
    }

    pub fn get_mut(&mut self, actor: ActorId) -> Option<&mut ActorState> {
        self.online.get_mut(&actor)
    }

    pub fn is_online(&self, actor: ActorId) -> bool {
        self.online.contains_key(&actor)
    }

    /// Offline actors never hold override.
    pub fn has_override(&self, actor: ActorId) -> bool {
        self.online.get(&actor).is_some_and(|s| s.override_enabled)
    }

    /// Returns false if the actor is not connected.
    pub fn set_override(&mut self, actor: ActorId, enabled: bool) -> bool {
        match self.online.get_mut(&actor) {
            Some(state) => {
                state.override_enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Record a display name without starting a session (e.g. claim owners
    /// loaded from storage).
    pub fn remember_name(&mut self, actor: ActorId, name: impl Into<String>) {
        self.names.insert(actor, name.into());
    }

    pub fn name_of(&self, actor: ActorId) -> Option<&str> {
        self.names.get(&actor).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActorId, &ActorState)> {
        self.online.iter().map(|(actor, state)| (*actor, state))
    }

    pub fn online_count(&self) -> usize {
        self.online.len()
    }
}
