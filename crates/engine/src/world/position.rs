/// Absolute block position in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPos {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl BlockPos {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// The chunk column this block belongs to.
    pub const fn chunk(&self) -> ChunkPos {
        ChunkPos {
            x: (self.x >> 4) as i32,
            z: (self.z >> 4) as i32,
        }
    }

    pub const fn above(&self) -> BlockPos {
        Self::new(self.x, self.y + 1, self.z)
    }

    pub const fn below(&self) -> BlockPos {
        Self::new(self.x, self.y - 1, self.z)
    }
}

/// A claim-level position. Claims are flat columns, so `y` is only carried
/// when the source knows it (an anchor, a player's feet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i64,
    pub y: Option<i64>,
    pub z: i64,
}

impl Position {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y: Some(y), z }
    }

    pub const fn flat(x: i64, z: i64) -> Self {
        Self { x, y: None, z }
    }

    /// Arithmetic shift, so negative coordinates floor into the right chunk.
    pub const fn chunk(&self) -> ChunkPos {
        ChunkPos {
            x: (self.x >> 4) as i32,
            z: (self.z >> 4) as i32,
        }
    }
}

impl From<BlockPos> for Position {
    fn from(pos: BlockPos) -> Self {
        Position::new(pos.x, pos.y, pos.z)
    }
}

/// Chunk column position (each chunk is 16x16 blocks horizontally).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub const fn block_origin(&self, y: i64) -> BlockPos {
        BlockPos::new((self.x as i64) << 4, y, (self.z as i64) << 4)
    }

    /// The `(2 * radius + 1)^2` square of chunks centred on this one,
    /// row by row along x.
    pub fn square(self, radius: i32) -> impl Iterator<Item = ChunkPos> {
        let radius = radius.max(0);
        (-radius..=radius)
            .flat_map(move |dx| (-radius..=radius).map(move |dz| ChunkPos::new(self.x + dx, self.z + dz)))
    }
}
