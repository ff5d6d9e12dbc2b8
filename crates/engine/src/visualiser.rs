//! Claim border overlays.
//!
//! While an actor holds the claim tool, every visible block on a nearby
//! partition's perimeter is shown to them as a marker block. Putting the
//! tool away sends the real blocks back. Overlays are client-side only;
//! the world itself is never modified.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};

use crate::actors::{ActorId, ActorState};
use crate::claims::{ClaimId, PartitionStore};
use crate::world::block::BlockId;
use crate::world::position::{BlockPos, ChunkPos};
use crate::world::BlockView;

/// Block categories the overlay cares about. Backed by lookup tables over
/// block ids in the game layer.
pub trait BlockClassifier {
    /// Blocks the player can see through (air, glass, plants, ...).
    fn is_transparent(&self, block: BlockId) -> bool;
    /// Thin floor coverings that get the carpet marker instead.
    fn is_carpet(&self, block: BlockId) -> bool;
    fn marker(&self) -> BlockId;
    fn carpet_marker(&self) -> BlockId;
}

/// What the visualiser needs to know about an online actor right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observer {
    pub actor: ActorId,
    pub feet: BlockPos,
    /// Claim tool in either hand.
    pub holding_tool: bool,
}

/// Lookup of live observer data, owned by the session layer.
pub trait ObserverLookup {
    fn observer(&self, actor: ActorId) -> Option<Observer>;
}

impl ObserverLookup for HashMap<ActorId, Observer> {
    fn observer(&self, actor: ActorId) -> Option<Observer> {
        self.get(&actor).copied()
    }
}

/// Show `block` at `pos` to one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayInstruction {
    pub pos: BlockPos,
    pub block: BlockId,
}

/// Perimeter cells of every partition indexed in the `(2r+1)²` chunk
/// square around `center`, grouped by claim.
pub fn visible_borders(
    store: &PartitionStore,
    center: ChunkPos,
    radius: u32,
) -> IndexMap<ClaimId, IndexSet<(i64, i64)>> {
    let mut borders: IndexMap<ClaimId, IndexSet<(i64, i64)>> = IndexMap::new();
    for partition in store.find_in_chunks(center.square(radius as i32)) {
        borders
            .entry(partition.claim_id)
            .or_default()
            .extend(partition.area().edges());
    }
    borders
}

/// Union of [`visible_borders`], each cell once.
pub fn visible_border_cells(store: &PartitionStore, center: ChunkPos, radius: u32) -> IndexSet<(i64, i64)> {
    visible_borders(store, center, radius)
        .into_values()
        .flatten()
        .collect()
}

/// Everything `update_visualisation` reads besides the actor itself.
pub struct OverlayScene<'a> {
    pub store: &'a PartitionStore,
    pub blocks: &'a dyn BlockView,
    pub classifier: &'a dyn BlockClassifier,
    pub radius: u32,
    pub y_range: i64,
}

impl OverlayScene<'_> {
    /// A solid block with air (or another see-through block) directly above
    /// or below it reads as a floor or ceiling.
    fn is_visible(&self, pos: BlockPos) -> bool {
        let block = self.blocks.block_at(pos);
        if self.classifier.is_transparent(block) {
            return false;
        }
        self.classifier.is_transparent(self.blocks.block_at(pos.above()))
            || self.classifier.is_transparent(self.blocks.block_at(pos.below()))
    }

    fn marker_for(&self, pos: BlockPos) -> BlockId {
        if self.classifier.is_carpet(self.blocks.block_at(pos)) {
            self.classifier.carpet_marker()
        } else {
            self.classifier.marker()
        }
    }

    /// Visible blocks within `y_range` of `feet` on the given border cells.
    fn visible_column_blocks<'c>(
        &'c self,
        cells: &'c IndexSet<(i64, i64)>,
        feet: BlockPos,
    ) -> impl Iterator<Item = BlockPos> + 'c {
        let ys = (feet.y - self.y_range)..=(feet.y + self.y_range);
        cells
            .iter()
            .flat_map(move |&(x, z)| ys.clone().map(move |y| BlockPos::new(x, y, z)))
            .filter(|pos| self.is_visible(*pos))
    }
}

/// Bring one actor's overlays in line with whether they hold the tool.
///
/// Without `force`, nothing happens unless the desired state differs from
/// the current one. With `force`, the overlay is recomputed either way (for
/// example after the actor moved into another chunk). Overlaid positions
/// are recorded per claim on the actor state so they can be reverted.
pub fn update_visualisation(
    state: &mut ActorState,
    observer: &Observer,
    force: bool,
    scene: &OverlayScene<'_>,
) -> Vec<OverlayInstruction> {
    let desired = observer.holding_tool;
    if !force && desired == state.visualizing {
        return Vec::new();
    }
    state.visualizing = desired;
    state.last_chunk = Some(observer.feet.chunk());

    let borders = visible_borders(scene.store, observer.feet.chunk(), scene.radius);
    let mut instructions = Vec::new();

    if desired {
        let mut shown: IndexMap<ClaimId, HashSet<BlockPos>> = IndexMap::new();
        for (claim, cells) in &borders {
            let positions: HashSet<BlockPos> = scene.visible_column_blocks(cells, observer.feet).collect();
            shown.insert(*claim, positions);
        }

        // Overlays left over from an earlier position that are no longer
        // in range go back to the real block.
        for (claim, old) in state.visualised.drain() {
            let current = shown.get(&claim);
            for pos in old {
                if current.is_none_or(|set| !set.contains(&pos)) {
                    instructions.push(OverlayInstruction {
                        pos,
                        block: scene.blocks.block_at(pos),
                    });
                }
            }
        }

        for (claim, positions) in shown {
            let mut ordered: Vec<BlockPos> = positions.iter().copied().collect();
            ordered.sort_by_key(|p| (p.x, p.z, p.y));
            instructions.extend(ordered.into_iter().map(|pos| OverlayInstruction {
                pos,
                block: scene.marker_for(pos),
            }));
            if !positions.is_empty() {
                state.visualised.insert(claim, positions);
            }
        }
    } else {
        let mut reverted: IndexSet<BlockPos> = IndexSet::new();
        for cells in borders.values() {
            reverted.extend(scene.visible_column_blocks(cells, observer.feet));
        }
        for (_, old) in state.visualised.drain() {
            reverted.extend(old);
        }
        instructions.extend(reverted.into_iter().map(|pos| OverlayInstruction {
            pos,
            block: scene.blocks.block_at(pos),
        }));
    }

    tracing::debug!(
        "Overlay for {} {} ({} instructions)",
        observer.actor,
        if desired { "shown" } else { "cleared" },
        instructions.len()
    );
    instructions
}
