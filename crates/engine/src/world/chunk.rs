use super::block::BlockId;
use std::collections::HashMap;

/// Blocks along each horizontal axis of a chunk, and the height of a section.
pub const CHUNK_WIDTH: usize = 16;
const SECTION_VOLUME: usize = CHUNK_WIDTH * CHUNK_WIDTH * CHUNK_WIDTH;

/// One chunk column, stored as sparse 16-high sections keyed by `y >> 4`.
///
/// Sections are only allocated once something other than air is written
/// into them; reads from missing sections return air.
#[derive(Clone, Default)]
pub struct Chunk {
    sections: HashMap<i64, Box<[BlockId; SECTION_VOLUME]>>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn index(x: u8, y: i64, z: u8) -> usize {
        (y.rem_euclid(16) as usize) * CHUNK_WIDTH * CHUNK_WIDTH
            + (z as usize) * CHUNK_WIDTH
            + (x as usize)
    }

    /// Read a block; `x`/`z` are chunk-local (0..16), `y` is absolute.
    pub fn get(&self, x: u8, y: i64, z: u8) -> BlockId {
        self.sections
            .get(&(y >> 4))
            .map_or(BlockId::AIR, |section| section[Self::index(x, y, z)])
    }

    pub fn set(&mut self, x: u8, y: i64, z: u8, block: BlockId) {
        let key = y >> 4;
        if block == BlockId::AIR && !self.sections.contains_key(&key) {
            return;
        }
        let section = self
            .sections
            .entry(key)
            .or_insert_with(|| Box::new([BlockId::AIR; SECTION_VOLUME]));
        section[Self::index(x, y, z)] = block;
        if block == BlockId::AIR && section.iter().all(|b| *b == BlockId::AIR) {
            self.sections.remove(&key);
        }
    }

    /// Fill one horizontal layer of the whole column.
    pub fn fill_layer(&mut self, y: i64, block: BlockId) {
        for x in 0..CHUNK_WIDTH as u8 {
            for z in 0..CHUNK_WIDTH as u8 {
                self.set(x, y, z, block);
            }
        }
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
}
