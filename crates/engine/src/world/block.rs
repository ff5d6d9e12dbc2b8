/// Opaque block state identifier. The engine never interprets these beyond
/// `AIR`; the game layer decides which ids are transparent, carpets, crops
/// and so on (see `visualiser::BlockClassifier`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockId(pub u16);

impl BlockId {
    /// The universal "empty" block. Unloaded space reads as air.
    pub const AIR: BlockId = BlockId(0);

    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }
}
