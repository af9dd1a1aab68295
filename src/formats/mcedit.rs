use crate::block_entity::BlockEntity;
use crate::entity::Entity;
use crate::error::LevelError;
use crate::formats::legacy::LegacyPalette;
use crate::formats::manager::SchematicImporter;
use crate::formats::{byte_array, compound_list, extent, int, read_nbt_auto, tag};
use crate::schematic::Schematic;
use quartz_nbt::{NbtCompound, NbtTag};
use tracing::debug;

const FORMAT: &str = "MCEdit";

/// Reader for MCEdit / WorldEdit `.schematic` files (`Materials = "Alpha"`).
pub struct McEditFormat;

impl SchematicImporter for McEditFormat {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn detect(&self, data: &[u8]) -> bool {
        is_mcedit(data)
    }

    fn read(&self, data: &[u8]) -> Result<Schematic, LevelError> {
        from_mcedit(data)
    }
}

pub fn is_mcedit(data: &[u8]) -> bool {
    let root = match read_nbt_auto(data, FORMAT) {
        Ok(root) => root,
        Err(_) => return false,
    };
    matches!(tag(&root, "Blocks"), Some(NbtTag::ByteArray(_))) && tag(&root, "Width").is_some()
}

pub fn from_mcedit(data: &[u8]) -> Result<Schematic, LevelError> {
    let root = read_nbt_auto(data, FORMAT)?;

    if let Some(NbtTag::String(materials)) = tag(&root, "Materials") {
        if materials != "Alpha" {
            return Err(LevelError::UnsupportedFormat(format!(
                "MCEdit materials {:?} (only Alpha is supported)",
                materials
            )));
        }
    }

    let width = extent(&root, "Width", FORMAT)?;
    let height = extent(&root, "Height", FORMAT)?;
    let length = extent(&root, "Length", FORMAT)?;
    let mut schematic = Schematic::new("", (width, height, length));
    let volume = schematic.volume();

    let blocks = byte_array(&root, "Blocks", FORMAT)?;
    let no_data;
    let block_data = match tag(&root, "Data") {
        Some(_) => byte_array(&root, "Data", FORMAT)?,
        None => {
            no_data = vec![0i8; volume];
            no_data.as_slice()
        }
    };
    if blocks.len() != volume || block_data.len() != volume {
        return Err(LevelError::malformed(
            FORMAT,
            format!(
                "expected {} blocks for {}x{}x{}, found {} ids and {} data values",
                volume,
                width,
                height,
                length,
                blocks.len(),
                block_data.len()
            ),
        ));
    }
    let add_blocks = match tag(&root, "AddBlocks") {
        Some(NbtTag::ByteArray(add)) => Some(add.as_slice()),
        _ => None,
    };
    if let Some(add) = add_blocks {
        if add.len() < (volume + 1) / 2 {
            return Err(LevelError::malformed(FORMAT, "AddBlocks is shorter than the block array"));
        }
    }

    let mut legacy = LegacyPalette::new();
    for index in 0..volume {
        let mut id = blocks[index] as u8 as u16;
        if let Some(add) = add_blocks {
            let nibble = add[index >> 1] as u8;
            let high = if index & 1 == 0 { nibble & 0x0F } else { nibble >> 4 };
            id |= (high as u16) << 8;
        }
        let state = legacy.resolve(id, block_data[index] as u8);
        let palette_index = schematic.get_or_insert_in_palette(&state);
        schematic.set_index(index, palette_index);
    }
    legacy.report();
    if legacy.fallback_count() > 0 {
        debug!("{} legacy blocks were substituted", legacy.fallback_count());
    }

    for compound in compound_list(&root, "TileEntities") {
        let mut block_entity = BlockEntity::from_nbt(compound)?;
        block_entity.id = modern_block_entity_id(&block_entity.id);
        schematic.add_block_entity(block_entity);
    }

    for compound in compound_list(&root, "Entities") {
        schematic.add_entity(Entity::from_nbt(compound)?);
    }

    if let Some(version) = data_version(&root) {
        schematic.data_version = Some(version);
    }

    debug!(
        "Read MCEdit schematic {}x{}x{} with {} palette entries, {} block entities",
        width,
        height,
        length,
        schematic.palette().len(),
        schematic.block_entities.len()
    );
    Ok(schematic)
}

fn data_version(root: &NbtCompound) -> Option<i32> {
    int(root, "DataVersion", FORMAT).ok()
}

/// `Chest` -> `minecraft:chest`, `MobSpawner` -> `minecraft:mob_spawner`.
fn modern_block_entity_id(id: &str) -> String {
    if id.contains(':') {
        return id.to_string();
    }
    let mut snake = String::with_capacity(id.len() + 4);
    for (i, c) in id.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                snake.push('_');
            }
            snake.push(c.to_ascii_lowercase());
        } else {
            snake.push(c);
        }
    }
    format!("minecraft:{}", snake)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlockState;
    use quartz_nbt::io::Flavor;
    use quartz_nbt::NbtList;

    fn write(root: &NbtCompound) -> Vec<u8> {
        let mut out = Vec::new();
        quartz_nbt::io::write_nbt(&mut out, Some("Schematic"), root, Flavor::Uncompressed).unwrap();
        out
    }

    fn sample_root() -> NbtCompound {
        // 2 x 1 x 2: stone, red wool, dirt, air
        let mut root = NbtCompound::new();
        root.insert("Width", NbtTag::Short(2));
        root.insert("Height", NbtTag::Short(1));
        root.insert("Length", NbtTag::Short(2));
        root.insert("Materials", NbtTag::String("Alpha".to_string()));
        root.insert("Blocks", NbtTag::ByteArray(vec![1, 35, 3, 0]));
        root.insert("Data", NbtTag::ByteArray(vec![0, 14, 0, 0]));
        root
    }

    #[test]
    fn test_read_blocks() {
        let data = write(&sample_root());
        assert!(is_mcedit(&data));

        let schematic = from_mcedit(&data).unwrap();
        assert_eq!(schematic.size, (2, 1, 2));
        assert_eq!(schematic.get_block(0, 0, 0), Some(&BlockState::new("minecraft:stone")));
        assert_eq!(schematic.get_block(1, 0, 0), Some(&BlockState::new("minecraft:red_wool")));
        assert_eq!(schematic.get_block(0, 0, 1), Some(&BlockState::new("minecraft:dirt")));
        assert_eq!(schematic.get_block(1, 0, 1), Some(&BlockState::air()));
    }

    #[test]
    fn test_add_blocks_extend_ids() {
        let mut root = sample_root();
        // Index 1 gets high nibble 1 -> id 35 + 256 = 291, unmapped -> stone.
        root.insert("AddBlocks", NbtTag::ByteArray(vec![0x10, 0x00]));
        let schematic = from_mcedit(&write(&root)).unwrap();
        assert_eq!(schematic.get_block(1, 0, 0), Some(&BlockState::new("minecraft:stone")));
        assert_eq!(schematic.get_block(0, 0, 0), Some(&BlockState::new("minecraft:stone")));
    }

    #[test]
    fn test_tile_entities_and_entities() {
        let mut root = sample_root();
        let mut chest = NbtCompound::new();
        chest.insert("id", NbtTag::String("Chest".to_string()));
        chest.insert("x", NbtTag::Int(1));
        chest.insert("y", NbtTag::Int(0));
        chest.insert("z", NbtTag::Int(1));
        root.insert("TileEntities", NbtTag::List(NbtList::from(vec![NbtTag::Compound(chest)])));

        let mut sheep = NbtCompound::new();
        sheep.insert("id", NbtTag::String("Sheep".to_string()));
        sheep.insert(
            "Pos",
            NbtTag::List(NbtList::from(vec![
                NbtTag::Double(0.5),
                NbtTag::Double(0.0),
                NbtTag::Double(0.5),
            ])),
        );
        root.insert("Entities", NbtTag::List(NbtList::from(vec![NbtTag::Compound(sheep)])));

        let schematic = from_mcedit(&write(&root)).unwrap();
        assert_eq!(schematic.block_entities[&(1, 0, 1)].id, "minecraft:chest");
        assert_eq!(schematic.entities.len(), 1);
        assert_eq!(schematic.entities[0].position, (0.5, 0.0, 0.5));
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let mut root = sample_root();
        root.insert("Blocks", NbtTag::ByteArray(vec![1, 1]));
        assert!(matches!(
            from_mcedit(&write(&root)),
            Err(LevelError::Malformed { .. })
        ));
    }

    #[test]
    fn test_missing_data_reads_as_zero() {
        let mut root = NbtCompound::new();
        root.insert("Width", NbtTag::Short(2));
        root.insert("Height", NbtTag::Short(1));
        root.insert("Length", NbtTag::Short(1));
        root.insert("Blocks", NbtTag::ByteArray(vec![3, 35]));

        let schematic = from_mcedit(&write(&root)).unwrap();
        assert_eq!(schematic.get_block(0, 0, 0), Some(&BlockState::new("minecraft:dirt")));
        assert_eq!(schematic.get_block(1, 0, 0), Some(&BlockState::new("minecraft:white_wool")));
    }

    #[test]
    fn test_rejects_non_alpha_materials() {
        let mut root = sample_root();
        root.insert("Materials", NbtTag::String("Pocket".to_string()));
        assert!(matches!(
            from_mcedit(&write(&root)),
            Err(LevelError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_block_entity_id_mapping() {
        assert_eq!(modern_block_entity_id("MobSpawner"), "minecraft:mob_spawner");
        assert_eq!(modern_block_entity_id("minecraft:sign"), "minecraft:sign");
    }
}
