//! Minecraft block classification over block state ids.
//!
//! BlockId values are MC block state IDs (from azalea-block), so every
//! category here is a bitmap indexed by state id, built once on first use
//! by walking every state azalea knows about.

use std::collections::HashMap;
use std::sync::LazyLock;

use azalea_block::{BlockState, BlockTrait};
use claims_engine::visualiser::BlockClassifier;
use claims_engine::world::block::BlockId;

// -- MC block state IDs (from azalea-block for MC 1.21.11) --

pub const AIR: BlockId = BlockId(0);
pub const STONE: BlockId = BlockId(1);
pub const GRASS_BLOCK: BlockId = BlockId(9); // snowy=false
pub const DIRT: BlockId = BlockId(10);
pub const BEDROCK: BlockId = BlockId(85);

// ── Name rules ───────────────────────────────────────────────────────────

/// Blocks a player sees through. Border overlays skip these and only mark
/// solid blocks with one of these directly above or below.
const TRANSPARENT_NAMES: &[&str] = &[
    "air", "cave_air", "void_air", "water", "lava", "fire", "soul_fire",
    "short_grass", "tall_grass", "fern", "large_fern", "dead_bush", "seagrass", "tall_seagrass",
    "dandelion", "poppy", "blue_orchid", "allium", "azure_bluet", "oxeye_daisy", "cornflower",
    "lily_of_the_valley", "wither_rose", "sunflower", "lilac", "rose_bush", "peony",
    "spore_blossom", "sugar_cane", "kelp", "kelp_plant", "moss_carpet", "hanging_roots",
    "big_dripleaf", "big_dripleaf_stem", "small_dripleaf", "budding_amethyst", "cobweb",
    "crimson_roots", "warped_roots", "nether_sprouts", "weeping_vines", "weeping_vines_plant",
    "twisting_vines", "twisting_vines_plant", "cave_vines", "cave_vines_plant", "vine",
    "glow_lichen", "lily_pad", "sweet_berry_bush", "bamboo_sapling", "powder_snow",
    "torch", "chorus_plant", "chorus_flower", "end_rod", "ladder", "chain", "iron_bars", "scaffolding",
    "chest", "trapped_chest", "ender_chest", "enchanting_table", "end_portal", "end_portal_frame",
    "nether_portal", "dragon_egg", "beacon", "conduit", "barrier", "anvil", "flower_pot",
    "cake", "candle", "lantern", "soul_lantern", "campfire", "soul_campfire", "bell",
    "composter", "smoker", "blast_furnace", "cartography_table", "fletching_table", "grindstone",
    "smithing_table", "stonecutter", "lectern", "hopper", "brewing_stand", "lightning_rod",
    "sculk_sensor", "tripwire", "tripwire_hook", "lever", "redstone_wire", "repeater",
    "comparator", "piston", "sticky_piston", "piston_head", "moving_piston", "rail",
    "turtle_egg", "shulker_box", "wheat", "carrots", "potatoes", "beetroots", "nether_wart",
    "cocoa", "pumpkin_stem", "melon_stem", "attached_pumpkin_stem", "attached_melon_stem",
];

const TRANSPARENT_SUFFIXES: &[&str] = &[
    "_sapling", "_tulip", "_mushroom", "_fungus", "_torch", "_fence", "_fence_gate", "_wall",
    "_pane", "_shulker_box", "_coral", "_coral_fan", "_coral_wall_fan", "_button",
    "_pressure_plate", "_door", "_trapdoor", "_rail", "_sign", "_bed", "_banner", "_skull",
    "_head", "_candle", "_candle_cake", "_anvil", "_amethyst_bud", "_chain", "_lantern", "_bars",
];

const TRANSPARENT_PREFIXES: &[&str] = &["potted_"];

/// Thin coverings that show a carpet marker instead of the full block.
const CARPET_NAMES: &[&str] = &["snow"];
const CARPET_SUFFIXES: &[&str] = &["_carpet"];

/// Blocks broken under the harvest permission rather than build.
const CROP_NAMES: &[&str] = &[
    "wheat", "carrots", "potatoes", "beetroots", "nether_wart", "cocoa", "sweet_berry_bush",
    "torchflower_crop", "pitcher_crop", "melon", "pumpkin",
];

const CONTAINER_NAMES: &[&str] = &[
    "chest", "trapped_chest", "barrel", "furnace", "blast_furnace", "smoker", "hopper",
    "dropper", "dispenser", "brewing_stand", "shulker_box", "chiseled_bookshelf",
    "decorated_pot", "crafter", "jukebox", "lectern",
];
const CONTAINER_SUFFIXES: &[&str] = &["_shulker_box"];

const REDSTONE_NAMES: &[&str] = &[
    "lever", "repeater", "comparator", "daylight_detector", "note_block",
];
const REDSTONE_SUFFIXES: &[&str] = &["_button", "_pressure_plate"];

const DOOR_SUFFIXES: &[&str] = &["_door", "_trapdoor", "_fence_gate"];

const SIGN_SUFFIXES: &[&str] = &["_sign"];

const BED_SUFFIXES: &[&str] = &["_bed"];

fn matches(name: &str, names: &[&str], suffixes: &[&str], prefixes: &[&str]) -> bool {
    names.contains(&name)
        || suffixes.iter().any(|s| name.ends_with(s))
        || prefixes.iter().any(|p| name.starts_with(p))
}

// ── State bitmaps ────────────────────────────────────────────────────────

/// Set of block state ids, one bit per state.
pub struct StateSet {
    words: Vec<u64>,
}

impl StateSet {
    fn with_capacity(states: usize) -> Self {
        Self {
            words: vec![0; states.div_ceil(64)],
        }
    }

    fn insert(&mut self, id: u16) {
        let (word, bit) = (id as usize / 64, id as usize % 64);
        if let Some(w) = self.words.get_mut(word) {
            *w |= 1 << bit;
        }
    }

    #[inline]
    pub fn contains(&self, id: BlockId) -> bool {
        let (word, bit) = (id.0 as usize / 64, id.0 as usize % 64);
        self.words.get(word).is_some_and(|w| w & (1 << bit) != 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Every block category the claim layer asks about.
pub struct BlockTags {
    pub transparent: StateSet,
    pub carpet: StateSet,
    pub crop: StateSet,
    pub container: StateSet,
    pub redstone: StateSet,
    pub door: StateSet,
    pub sign: StateSet,
    pub bed: StateSet,
    /// First state of `cyan_glazed_terracotta`.
    pub marker: BlockId,
    /// The `cyan_carpet` state.
    pub carpet_marker: BlockId,
    /// First state of every block, by registry name.
    pub by_name: HashMap<String, BlockId>,
}

/// Lazily-built tables over all MC block states.
pub static TAGS: LazyLock<BlockTags> = LazyLock::new(build_tags);

fn build_tags() -> BlockTags {
    let states = BlockState::MAX_STATE as usize + 1;
    let mut tags = BlockTags {
        transparent: StateSet::with_capacity(states),
        carpet: StateSet::with_capacity(states),
        crop: StateSet::with_capacity(states),
        container: StateSet::with_capacity(states),
        redstone: StateSet::with_capacity(states),
        door: StateSet::with_capacity(states),
        sign: StateSet::with_capacity(states),
        bed: StateSet::with_capacity(states),
        marker: STONE,
        carpet_marker: STONE,
        by_name: HashMap::new(),
    };

    for id in 0..=BlockState::MAX_STATE {
        let Ok(state) = BlockState::try_from(id as u32) else {
            continue;
        };
        let block: Box<dyn BlockTrait> = Box::<dyn BlockTrait>::from(state);
        let name = block.id().to_string();
        tags.by_name.entry(name.clone()).or_insert(BlockId(id as u16));
        let name = name.as_str();

        if matches(name, TRANSPARENT_NAMES, TRANSPARENT_SUFFIXES, TRANSPARENT_PREFIXES) {
            tags.transparent.insert(id as u16);
        }
        if matches(name, CARPET_NAMES, CARPET_SUFFIXES, &[]) {
            tags.carpet.insert(id as u16);
        }
        if matches(name, CROP_NAMES, &[], &[]) {
            tags.crop.insert(id as u16);
        }
        if matches(name, CONTAINER_NAMES, CONTAINER_SUFFIXES, &[]) {
            tags.container.insert(id as u16);
        }
        if matches(name, REDSTONE_NAMES, REDSTONE_SUFFIXES, &[]) {
            tags.redstone.insert(id as u16);
        }
        if matches(name, &[], DOOR_SUFFIXES, &[]) {
            tags.door.insert(id as u16);
        }
        if matches(name, &[], SIGN_SUFFIXES, &[]) {
            tags.sign.insert(id as u16);
        }
        if matches(name, &[], BED_SUFFIXES, &[]) {
            tags.bed.insert(id as u16);
        }
    }

    let markers = (
        tags.by_name.get("cyan_glazed_terracotta").copied(),
        tags.by_name.get("cyan_carpet").copied(),
    );
    match markers {
        (Some(m), Some(c)) => {
            tags.marker = m;
            tags.carpet_marker = c;
        }
        _ => tracing::warn!("Marker blocks missing from the block registry, falling back to stone"),
    }
    tracing::debug!(
        "Block tags built: {} transparent, {} carpet, {} crop states",
        tags.transparent.len(),
        tags.carpet.len(),
        tags.crop.len()
    );
    tags
}

pub fn is_transparent(id: BlockId) -> bool {
    TAGS.transparent.contains(id)
}

pub fn is_crop(id: BlockId) -> bool {
    TAGS.crop.contains(id)
}

pub fn is_container(id: BlockId) -> bool {
    TAGS.container.contains(id)
}

pub fn is_redstone_component(id: BlockId) -> bool {
    TAGS.redstone.contains(id)
}

pub fn is_door(id: BlockId) -> bool {
    TAGS.door.contains(id)
}

pub fn is_sign(id: BlockId) -> bool {
    TAGS.sign.contains(id)
}

pub fn is_bed(id: BlockId) -> bool {
    TAGS.bed.contains(id)
}

/// First state of the named block (`"chest"`, `"oak_door"`).
pub fn by_name(name: &str) -> Option<BlockId> {
    TAGS.by_name.get(name).copied()
}

/// The block's registry name ("stone", "oak_door", ...), for logs.
pub fn name(id: BlockId) -> String {
    match BlockState::try_from(id.0 as u32) {
        Ok(state) => Box::<dyn BlockTrait>::from(state).id().to_string(),
        Err(_) => format!("unknown#{}", id.0),
    }
}

/// The classifier the border visualiser runs with on a Minecraft world.
pub struct McBlocks;

impl BlockClassifier for McBlocks {
    fn is_transparent(&self, block: BlockId) -> bool {
        is_transparent(block)
    }

    fn is_carpet(&self, block: BlockId) -> bool {
        TAGS.carpet.contains(block)
    }

    fn marker(&self) -> BlockId {
        TAGS.marker
    }

    fn carpet_marker(&self) -> BlockId {
        TAGS.carpet_marker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_rules() {
        assert!(matches("oak_sapling", TRANSPARENT_NAMES, TRANSPARENT_SUFFIXES, TRANSPARENT_PREFIXES));
        assert!(matches("potted_fern", TRANSPARENT_NAMES, TRANSPARENT_SUFFIXES, TRANSPARENT_PREFIXES));
        assert!(!matches("stone", TRANSPARENT_NAMES, TRANSPARENT_SUFFIXES, TRANSPARENT_PREFIXES));
        // Solid blocks that share a prefix with a see-through one.
        assert!(!matches("brown_mushroom_block", TRANSPARENT_NAMES, TRANSPARENT_SUFFIXES, TRANSPARENT_PREFIXES));
        assert!(!matches("brain_coral_block", TRANSPARENT_NAMES, TRANSPARENT_SUFFIXES, TRANSPARENT_PREFIXES));
        assert!(matches("moss_carpet", CARPET_NAMES, CARPET_SUFFIXES, &[]));
    }

    #[test]
    fn bitmap_membership() {
        let mut set = StateSet::with_capacity(200);
        set.insert(0);
        set.insert(129);
        assert!(set.contains(BlockId(0)));
        assert!(set.contains(BlockId(129)));
        assert!(!set.contains(BlockId(128)));
        assert!(!set.contains(BlockId(60_000)));
        assert_eq!(set.len(), 2);
    }
}
