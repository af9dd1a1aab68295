use crate::block_entity::BlockEntity;
use crate::entity::Entity;
use crate::error::LevelError;
use crate::formats::manager::SchematicImporter;
use crate::formats::{byte_array, compound_list, extent, int, read_nbt_auto, tag};
use crate::schematic::Schematic;
use crate::BlockState;
use quartz_nbt::{NbtCompound, NbtTag};
use tracing::debug;

const FORMAT: &str = "Sponge";

/// Reader for Sponge `.schem` files, versions 2 and 3.
pub struct SpongeFormat;

impl SchematicImporter for SpongeFormat {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn detect(&self, data: &[u8]) -> bool {
        is_sponge(data)
    }

    fn read(&self, data: &[u8]) -> Result<Schematic, LevelError> {
        from_sponge(data)
    }
}

/// The compound holding the schematic body: the root for v2, `Schematic` for v3.
fn body(root: &NbtCompound) -> Option<(&NbtCompound, i32)> {
    if let Some(NbtTag::Compound(inner)) = tag(root, "Schematic") {
        return Some((inner, int(inner, "Version", FORMAT).unwrap_or(3)));
    }
    if tag(root, "Palette").is_some() && tag(root, "BlockData").is_some() {
        return Some((root, int(root, "Version", FORMAT).unwrap_or(2)));
    }
    None
}

pub fn is_sponge(data: &[u8]) -> bool {
    match read_nbt_auto(data, FORMAT) {
        Ok(root) => body(&root).is_some(),
        Err(_) => false,
    }
}

pub fn from_sponge(data: &[u8]) -> Result<Schematic, LevelError> {
    let root = read_nbt_auto(data, FORMAT)?;
    let (body, version) =
        body(&root).ok_or_else(|| LevelError::malformed(FORMAT, "no Sponge schematic body"))?;

    let width = extent(body, "Width", FORMAT)?;
    let height = extent(body, "Height", FORMAT)?;
    let length = extent(body, "Length", FORMAT)?;
    let mut schematic = Schematic::new("", (width, height, length));
    schematic.data_version = int(body, "DataVersion", FORMAT).ok();

    if let Some(NbtTag::Compound(metadata)) = tag(body, "Metadata") {
        if let Ok(name) = metadata.get::<_, &str>("Name") {
            schematic.name = name.to_string();
        }
    }

    let (blocks, palette_key, data_key) = if version >= 3 {
        match tag(body, "Blocks") {
            Some(NbtTag::Compound(blocks)) => (blocks, "Palette", "Data"),
            _ => return Err(LevelError::malformed(FORMAT, "missing Blocks container")),
        }
    } else {
        (body, "Palette", "BlockData")
    };

    let palette = read_palette(blocks, palette_key)?;
    let block_data = byte_array(blocks, data_key, FORMAT)?;
    let indices = decode_varints(block_data, schematic.volume())?;
    for (index, palette_id) in indices.into_iter().enumerate() {
        let state = palette.get(palette_id as usize).ok_or_else(|| {
            LevelError::malformed(FORMAT, format!("palette index {} out of range", palette_id))
        })?;
        let palette_index = schematic.get_or_insert_in_palette(state);
        schematic.set_index(index, palette_index);
    }

    for compound in compound_list(blocks, "BlockEntities") {
        schematic.add_block_entity(read_block_entity(compound, version)?);
    }
    for compound in compound_list(body, "Entities") {
        schematic.add_entity(read_entity(compound, version)?);
    }

    debug!(
        "Read Sponge v{} schematic {}x{}x{} with {} palette entries",
        version,
        width,
        height,
        length,
        schematic.palette().len()
    );
    Ok(schematic)
}

/// Palette compound maps a block state string to its index.
fn read_palette(container: &NbtCompound, key: &str) -> Result<Vec<BlockState>, LevelError> {
    let palette = match tag(container, key) {
        Some(NbtTag::Compound(palette)) => palette,
        _ => return Err(LevelError::malformed(FORMAT, format!("missing {}", key))),
    };

    let mut entries: Vec<(i32, BlockState)> = Vec::with_capacity(palette.len());
    for (name, value) in palette.inner() {
        let index = match value {
            NbtTag::Int(i) => *i,
            _ => return Err(LevelError::malformed(FORMAT, format!("palette entry {} is not an int", name))),
        };
        entries.push((index, BlockState::parse(name)?));
    }
    entries.sort_by_key(|(index, _)| *index);

    let mut states = Vec::with_capacity(entries.len());
    for (expected, (index, state)) in entries.into_iter().enumerate() {
        if index as usize != expected {
            return Err(LevelError::malformed(FORMAT, format!("palette has a gap at index {}", expected)));
        }
        states.push(state);
    }
    Ok(states)
}

fn decode_varints(bytes: &[i8], count: usize) -> Result<Vec<u32>, LevelError> {
    let mut values = Vec::with_capacity(count);
    let mut value: u32 = 0;
    let mut shift = 0;
    for &byte in bytes {
        let byte = byte as u8;
        if shift >= 32 {
            return Err(LevelError::malformed(FORMAT, "varint longer than 5 bytes"));
        }
        value |= ((byte & 0x7F) as u32) << shift;
        if byte & 0x80 == 0 {
            values.push(value);
            value = 0;
            shift = 0;
        } else {
            shift += 7;
        }
    }
    if shift != 0 {
        return Err(LevelError::malformed(FORMAT, "block data ends inside a varint"));
    }
    if values.len() != count {
        return Err(LevelError::malformed(
            FORMAT,
            format!("expected {} block indices, found {}", count, values.len()),
        ));
    }
    Ok(values)
}

fn read_position(compound: &NbtCompound) -> Result<(i32, i32, i32), LevelError> {
    match tag(compound, "Pos") {
        Some(NbtTag::IntArray(pos)) if pos.len() == 3 => Ok((pos[0], pos[1], pos[2])),
        _ => Err(LevelError::malformed(FORMAT, "block entity Pos must be an int array of 3")),
    }
}

fn read_block_entity(compound: &NbtCompound, version: i32) -> Result<BlockEntity, LevelError> {
    let position = read_position(compound)?;
    let id = compound
        .get::<_, &str>("Id")
        .map_err(|e| LevelError::malformed(FORMAT, format!("block entity without Id: {}", e)))?;
    let mut block_entity = BlockEntity::new(id, position);

    // v3 nests the payload under Data; v2 keeps it inline.
    let payload = match (version >= 3, tag(compound, "Data")) {
        (true, Some(NbtTag::Compound(data))) => data,
        _ => compound,
    };
    for (key, value) in payload.inner() {
        match key.as_str() {
            "Pos" | "Id" | "id" | "x" | "y" | "z" => continue,
            _ => {
                block_entity.nbt.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(block_entity)
}

fn read_entity(compound: &NbtCompound, version: i32) -> Result<Entity, LevelError> {
    if version < 3 {
        return Entity::from_nbt(compound);
    }
    let mut flattened = match tag(compound, "Data") {
        Some(NbtTag::Compound(data)) => data.clone(),
        _ => NbtCompound::new(),
    };
    for key in ["Id", "Pos"] {
        if let Some(value) = tag(compound, key) {
            flattened.insert(key, value.clone());
        }
    }
    Entity::from_nbt(&flattened)
}
