use std::fmt;

use uuid::Uuid;

use super::claim::ClaimId;
use crate::world::area::Area;
use crate::world::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionId(pub Uuid);

impl PartitionId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One rectangular piece of a claim. The corners are kept as given; the
/// normalized rectangle is cached in `area`.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub id: PartitionId,
    pub claim_id: ClaimId,
    pub first_corner: Position,
    pub second_corner: Position,
    area: Area,
}

impl Partition {
    pub fn new(claim_id: ClaimId, first_corner: Position, second_corner: Position) -> Self {
        Self::with_id(PartitionId::random(), claim_id, first_corner, second_corner)
    }

    pub fn with_id(
        id: PartitionId,
        claim_id: ClaimId,
        first_corner: Position,
        second_corner: Position,
    ) -> Self {
        Self {
            id,
            claim_id,
            first_corner,
            second_corner,
            area: Area::from_corners(first_corner, second_corner),
        }
    }

    pub fn area(&self) -> &Area {
        &self.area
    }

    pub fn contains(&self, pos: &Position) -> bool {
        self.area.contains_position(pos)
    }
}
