//! Pre-flattening (numeric id + data nibble) block ids mapped to modern block states.
//!
//! Covers the terrain, building and colour blocks that generated terrain
//! schematics use. Ids outside the table resolve through [`LegacyPalette`],
//! which falls back and counts.

use crate::BlockState;
use rustc_hash::FxHashMap;
use tracing::warn;

const COLORS: [&str; 16] = [
    "white",
    "orange",
    "magenta",
    "light_blue",
    "yellow",
    "lime",
    "pink",
    "gray",
    "light_gray",
    "cyan",
    "purple",
    "blue",
    "brown",
    "green",
    "red",
    "black",
];

const WOODS: [&str; 6] = ["oak", "spruce", "birch", "jungle", "acacia", "dark_oak"];

const DOUBLE_PLANTS: [&str; 6] = [
    "sunflower",
    "lilac",
    "tall_grass",
    "large_fern",
    "rose_bush",
    "peony",
];

const FALLBACK: &str = "minecraft:stone";

fn block(name: &str) -> BlockState {
    BlockState::new(format!("minecraft:{}", name))
}

fn colored(data: u8, suffix: &str) -> BlockState {
    block(&format!("{}_{}", COLORS[(data & 0xF) as usize], suffix))
}

fn log_axis(data: u8) -> &'static str {
    match (data >> 2) & 0x3 {
        1 => "x",
        2 => "z",
        _ => "y",
    }
}

fn chest_facing(data: u8) -> &'static str {
    match data & 0x7 {
        3 => "south",
        4 => "west",
        5 => "east",
        _ => "north",
    }
}

fn double_plant(data: u8) -> Option<&'static str> {
    DOUBLE_PLANTS.get(data as usize).copied()
}

fn wood(index: u8) -> Option<&'static str> {
    WOODS.get(index as usize).copied()
}

fn fluid(name: &str, data: u8) -> BlockState {
    block(name).with_property("level", (data & 0xF).to_string())
}

/// Resolve one legacy id/data pair, `None` when the pair is not in the table.
pub fn legacy_block(id: u16, data: u8) -> Option<BlockState> {
    let data = data & 0xF;
    let state = match (id, data) {
        (0, _) => block("air"),
        (1, 0) => block("stone"),
        (1, 1) => block("granite"),
        (1, 2) => block("polished_granite"),
        (1, 3) => block("diorite"),
        (1, 4) => block("polished_diorite"),
        (1, 5) => block("andesite"),
        (1, 6) => block("polished_andesite"),
        (2, _) => block("grass_block"),
        (3, 0) => block("dirt"),
        (3, 1) => block("coarse_dirt"),
        (3, 2) => block("podzol"),
        (4, _) => block("cobblestone"),
        (5, d) => block(&format!("{}_planks", wood(d)?)),
        (6, d) => block(&format!("{}_sapling", wood(d & 0x7)?)),
        (7, _) => block("bedrock"),
        (8, d) | (9, d) => fluid("water", d),
        (10, d) | (11, d) => fluid("lava", d),
        (12, 0) => block("sand"),
        (12, 1) => block("red_sand"),
        (13, _) => block("gravel"),
        (14, _) => block("gold_ore"),
        (15, _) => block("iron_ore"),
        (16, _) => block("coal_ore"),
        (17, d) => block(&format!("{}_log", wood(d & 0x3)?)).with_property("axis", log_axis(d)),
        (18, d) => block(&format!("{}_leaves", wood(d & 0x3)?)).with_property("persistent", "true"),
        (19, 0) => block("sponge"),
        (19, 1) => block("wet_sponge"),
        (20, _) => block("glass"),
        (21, _) => block("lapis_ore"),
        (22, _) => block("lapis_block"),
        (24, 0) => block("sandstone"),
        (24, 1) => block("chiseled_sandstone"),
        (24, 2) => block("cut_sandstone"),
        (30, _) => block("cobweb"),
        (31, 0) => block("dead_bush"),
        (31, 1) => block("short_grass"),
        (31, 2) => block("fern"),
        (32, _) => block("dead_bush"),
        (35, d) => colored(d, "wool"),
        (37, _) => block("dandelion"),
        (38, 0) => block("poppy"),
        (38, 1) => block("blue_orchid"),
        (38, 2) => block("allium"),
        (38, 3) => block("azure_bluet"),
        (38, 4) => block("red_tulip"),
        (38, 5) => block("orange_tulip"),
        (38, 6) => block("white_tulip"),
        (38, 7) => block("pink_tulip"),
        (38, 8) => block("oxeye_daisy"),
        (39, _) => block("brown_mushroom"),
        (40, _) => block("red_mushroom"),
        (41, _) => block("gold_block"),
        (42, _) => block("iron_block"),
        (43, 0) => block("smooth_stone_slab").with_property("type", "double"),
        (43, 1) => block("sandstone_slab").with_property("type", "double"),
        (43, 3) => block("cobblestone_slab").with_property("type", "double"),
        (43, 4) => block("brick_slab").with_property("type", "double"),
        (43, 5) => block("stone_brick_slab").with_property("type", "double"),
        (43, 8) => block("smooth_stone"),
        (44, d) => {
            let name = match d & 0x7 {
                0 => "smooth_stone_slab",
                1 => "sandstone_slab",
                3 => "cobblestone_slab",
                4 => "brick_slab",
                5 => "stone_brick_slab",
                6 => "nether_brick_slab",
                7 => "quartz_slab",
                _ => return None,
            };
            let half = if d & 0x8 != 0 { "top" } else { "bottom" };
            block(name).with_property("type", half)
        }
        (45, _) => block("bricks"),
        (46, _) => block("tnt"),
        (47, _) => block("bookshelf"),
        (48, _) => block("mossy_cobblestone"),
        (49, _) => block("obsidian"),
        (54, d) => block("chest").with_property("facing", chest_facing(d)),
        (56, _) => block("diamond_ore"),
        (57, _) => block("diamond_block"),
        (58, _) => block("crafting_table"),
        (60, _) => block("farmland"),
        (73, _) | (74, _) => block("redstone_ore"),
        (78, d) => block("snow").with_property("layers", ((d & 0x7) + 1).to_string()),
        (79, _) => block("ice"),
        (80, _) => block("snow_block"),
        (81, _) => block("cactus"),
        (82, _) => block("clay"),
        (86, _) => block("carved_pumpkin"),
        (87, _) => block("netherrack"),
        (88, _) => block("soul_sand"),
        (89, _) => block("glowstone"),
        (95, d) => colored(d, "stained_glass"),
        (97, 0) => block("infested_stone"),
        (98, 0) => block("stone_bricks"),
        (98, 1) => block("mossy_stone_bricks"),
        (98, 2) => block("cracked_stone_bricks"),
        (98, 3) => block("chiseled_stone_bricks"),
        (99, _) => block("brown_mushroom_block"),
        (100, _) => block("red_mushroom_block"),
        (101, _) => block("iron_bars"),
        (102, _) => block("glass_pane"),
        (103, _) => block("melon"),
        (106, _) => block("vine"),
        (110, _) => block("mycelium"),
        (111, _) => block("lily_pad"),
        (112, _) => block("nether_bricks"),
        (121, _) => block("end_stone"),
        (125, d) => block(&format!("{}_slab", wood(d & 0x7)?)).with_property("type", "double"),
        (126, d) => {
            let half = if d & 0x8 != 0 { "top" } else { "bottom" };
            block(&format!("{}_slab", wood(d & 0x7)?)).with_property("type", half)
        }
        (129, _) => block("emerald_ore"),
        (133, _) => block("emerald_block"),
        (152, _) => block("redstone_block"),
        (153, _) => block("nether_quartz_ore"),
        (155, 0) => block("quartz_block"),
        (155, 1) => block("chiseled_quartz_block"),
        (155, 2) => block("quartz_pillar").with_property("axis", "y"),
        (159, d) => colored(d, "terracotta"),
        (160, d) => colored(d, "stained_glass_pane"),
        (161, d) => block(&format!("{}_leaves", wood((d & 0x1) + 4)?))
            .with_property("persistent", "true"),
        (162, d) => {
            block(&format!("{}_log", wood((d & 0x1) + 4)?)).with_property("axis", log_axis(d))
        }
        (165, _) => block("slime_block"),
        (168, 0) => block("prismarine"),
        (168, 1) => block("prismarine_bricks"),
        (168, 2) => block("dark_prismarine"),
        (169, _) => block("sea_lantern"),
        (170, _) => block("hay_block").with_property("axis", "y"),
        (171, d) => colored(d, "carpet"),
        (172, _) => block("terracotta"),
        (173, _) => block("coal_block"),
        (174, _) => block("packed_ice"),
        (175, d) => {
            let half = if d & 0x8 != 0 { "upper" } else { "lower" };
            block(double_plant(d & 0x7)?).with_property("half", half)
        }
        (179, 0) => block("red_sandstone"),
        (179, 1) => block("chiseled_red_sandstone"),
        (179, 2) => block("cut_red_sandstone"),
        (201, _) => block("purpur_block"),
        (206, _) => block("end_stone_bricks"),
        (208, _) => block("dirt_path"),
        (213, _) => block("magma_block"),
        (214, _) => block("nether_wart_block"),
        (215, _) => block("red_nether_bricks"),
        (216, _) => block("bone_block").with_property("axis", "y"),
        (235..=250, _) => colored((id - 235) as u8, "glazed_terracotta"),
        (251, d) => colored(d, "concrete"),
        (252, d) => colored(d, "concrete_powder"),
        _ => return None,
    };
    Some(state)
}

/// Memoizing resolver used by the MCEdit reader.
#[derive(Debug, Default)]
pub struct LegacyPalette {
    resolved: FxHashMap<(u16, u8), BlockState>,
    fallbacks: FxHashMap<(u16, u8), usize>,
}

impl LegacyPalette {
    pub fn new() -> Self {
        LegacyPalette::default()
    }

    /// Table lookup, then the id's data-0 state, then `minecraft:stone`.
    pub fn resolve(&mut self, id: u16, data: u8) -> BlockState {
        let key = (id, data & 0xF);
        if let Some(state) = self.resolved.get(&key) {
            if !self.fallbacks.is_empty() {
                if let Some(count) = self.fallbacks.get_mut(&key) {
                    *count += 1;
                }
            }
            return state.clone();
        }

        let state = match legacy_block(key.0, key.1) {
            Some(state) => state,
            None => {
                self.fallbacks.insert(key, 1);
                legacy_block(id, 0).unwrap_or_else(|| BlockState::new(FALLBACK))
            }
        };
        self.resolved.insert(key, state.clone());
        state
    }

    /// Number of blocks that went through a fallback.
    pub fn fallback_count(&self) -> usize {
        self.fallbacks.values().sum()
    }

    /// Emit one warning per unmapped id/data pair.
    pub fn report(&self) {
        let mut pairs: Vec<_> = self.fallbacks.iter().collect();
        pairs.sort();
        for ((id, data), count) in pairs {
            warn!(
                "Legacy block {}:{} has no modern mapping, substituted {} ({} blocks)",
                id,
                data,
                self.resolved
                    .get(&(*id, *data))
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| FALLBACK.to_string()),
                count
            );
        }
    }
}
