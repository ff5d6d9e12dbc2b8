use std::fmt;
use std::time::SystemTime;

use uuid::Uuid;

use crate::actors::ActorId;
use crate::world::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClaimId(pub Uuid);

impl ClaimId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A named, owned region. Its shape lives entirely in its partitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    pub id: ClaimId,
    pub world_id: Uuid,
    pub owner: ActorId,
    pub created_at: SystemTime,
    pub name: String,
    pub description: String,
    /// Where the claim was founded (its bell, in game terms).
    pub anchor: Position,
}

impl Claim {
    pub fn new(world_id: Uuid, owner: ActorId, anchor: Position) -> Self {
        Self {
            id: ClaimId::random(),
            world_id,
            owner,
            created_at: SystemTime::now(),
            name: String::new(),
            description: String::new(),
            anchor,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
