pub mod area;
pub mod block;
pub mod chunk;
pub mod position;

use block::BlockId;
use chunk::Chunk;
use dashmap::DashMap;
use position::{BlockPos, ChunkPos};

/// Read-only access to real block state. The border visualiser samples
/// blocks through this so it can run against the live world or a test grid.
pub trait BlockView {
    fn block_at(&self, pos: BlockPos) -> BlockId;
}

/// The block world, lock-sharded by chunk.
///
/// The claim engine never writes here; the game layer owns world mutation
/// and the engine only reads it to decide where overlays are visible.
pub struct World {
    chunks: DashMap<ChunkPos, Chunk>,
}

impl World {
    pub fn new() -> Self {
        Self {
            chunks: DashMap::new(),
        }
    }

    /// Read a block at an absolute position. Returns AIR for unloaded chunks.
    pub fn get_block(&self, pos: BlockPos) -> BlockId {
        match self.chunks.get(&pos.chunk()) {
            Some(chunk) => chunk.get((pos.x & 0xF) as u8, pos.y, (pos.z & 0xF) as u8),
            None => BlockId::AIR,
        }
    }

    /// Write a block at an absolute position. Creates the chunk if needed.
    pub fn set_block(&self, pos: BlockPos, block: BlockId) {
        self.chunks
            .entry(pos.chunk())
            .or_default()
            .set((pos.x & 0xF) as u8, pos.y, (pos.z & 0xF) as u8, block);
    }

    pub fn insert_chunk(&self, pos: ChunkPos, chunk: Chunk) {
        self.chunks.insert(pos, chunk);
    }

    pub fn has_chunk(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockView for World {
    fn block_at(&self, pos: BlockPos) -> BlockId {
        self.get_block(pos)
    }
}
