use crate::block_entity::BlockEntity;
use crate::entity::Entity;
use crate::error::{LevelError, NbtContext};
use crate::selection::BlockPos;
use crate::BlockState;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use quartz_nbt::io::Flavor;
use quartz_nbt::{NbtCompound, NbtList, NbtTag};
use std::io::{Cursor, Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

const SECTOR_BYTES: usize = 4096;
const HEADER_BYTES: usize = 2 * SECTOR_BYTES;
const CHUNKS_PER_REGION: usize = 1024;
const SECTION_VOLUME: usize = 4096;
const MAX_SECTOR_COUNT: usize = 255;

// ─── Region container ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompressionType {
    Gzip = 1,
    Zlib = 2,
    Uncompressed = 3,
    Lz4 = 4,
}

impl CompressionType {
    pub fn from_byte(b: u8) -> Result<Self, LevelError> {
        if b & 0x80 != 0 {
            return Err(LevelError::Unsupported("external .mcc chunk storage"));
        }
        match b {
            1 => Ok(CompressionType::Gzip),
            2 => Ok(CompressionType::Zlib),
            3 => Ok(CompressionType::Uncompressed),
            4 => Ok(CompressionType::Lz4),
            _ => Err(LevelError::malformed(
                "region",
                format!("unknown compression type {}", b),
            )),
        }
    }
}

/// A chunk payload exactly as stored in the region file.
#[derive(Debug, Clone)]
struct RawChunk {
    compression: u8,
    payload: Vec<u8>,
}

/// One `r.X.Z.mca` file. Chunks stay compressed until they are read, so a
/// chunk that is never rewritten is saved back byte for byte.
#[derive(Debug, Clone)]
pub struct McaFile {
    pub region_x: i32,
    pub region_z: i32,
    slots: Vec<Option<RawChunk>>,
    timestamps: Vec<u32>,
}

fn be_u24(bytes: &[u8]) -> u32 {
    ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | (bytes[2] as u32)
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn now_seconds() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

impl McaFile {
    pub fn new(region_x: i32, region_z: i32) -> Self {
        McaFile {
            region_x,
            region_z,
            slots: vec![None; CHUNKS_PER_REGION],
            timestamps: vec![0; CHUNKS_PER_REGION],
        }
    }

    /// Parse the region header. An empty file is an empty region.
    pub fn from_bytes(data: &[u8], region_x: i32, region_z: i32) -> Result<Self, LevelError> {
        let mut file = McaFile::new(region_x, region_z);
        if data.is_empty() {
            return Ok(file);
        }
        if data.len() < HEADER_BYTES {
            return Err(LevelError::malformed(
                "region",
                format!(
                    "r.{}.{}.mca is {} bytes, shorter than its header",
                    region_x,
                    region_z,
                    data.len()
                ),
            ));
        }

        for i in 0..CHUNKS_PER_REGION {
            let entry = i * 4;
            let sector = be_u24(&data[entry..entry + 3]) as usize;
            let sector_count = data[entry + 3] as usize;
            file.timestamps[i] = be_u32(&data[SECTOR_BYTES + entry..SECTOR_BYTES + entry + 4]);

            if sector < 2 || sector_count == 0 {
                continue;
            }

            let start = sector * SECTOR_BYTES;
            if start + 5 > data.len() {
                return Err(LevelError::malformed(
                    "region",
                    format!("chunk slot {} points past the end of the file", i),
                ));
            }
            let length = be_u32(&data[start..start + 4]) as usize;
            if length == 0 {
                continue;
            }
            let end = start + 4 + length;
            if end > data.len() {
                return Err(LevelError::malformed(
                    "region",
                    format!("chunk slot {} is truncated ({} bytes declared)", i, length),
                ));
            }

            file.slots[i] = Some(RawChunk {
                compression: data[start + 4],
                payload: data[start + 5..end].to_vec(),
            });
        }

        Ok(file)
    }

    /// Slot of a chunk inside its region: `(x & 31) + (z & 31) * 32`.
    pub fn index(chunk_x: i32, chunk_z: i32) -> usize {
        (floor_mod(chunk_x, 32) + floor_mod(chunk_z, 32) * 32) as usize
    }

    pub fn chunk_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn timestamp(&self, index: usize) -> u32 {
        self.timestamps.get(index).copied().unwrap_or(0)
    }

    /// Chunk coordinates of a slot.
    pub fn chunk_coords(&self, index: usize) -> (i32, i32) {
        (
            self.region_x * 32 + (index % 32) as i32,
            self.region_z * 32 + (index / 32) as i32,
        )
    }

    /// Decompress and decode the chunk in `index`, `None` when the slot is empty.
    pub fn read_nbt(&self, index: usize) -> Result<Option<NbtCompound>, LevelError> {
        let raw = match self.slots.get(index) {
            Some(Some(raw)) => raw,
            _ => return Ok(None),
        };
        let compression = CompressionType::from_byte(raw.compression)?;
        let decompressed = decompress_chunk(&raw.payload, compression)?;
        let (nbt, _) =
            quartz_nbt::io::read_nbt(&mut Cursor::new(&decompressed), Flavor::Uncompressed)
                .nbt_context("chunk")?;
        Ok(Some(nbt))
    }

    /// Replace the chunk in `index` with zlib-compressed `nbt` and stamp it.
    pub fn write_nbt(&mut self, index: usize, nbt: &NbtCompound) -> Result<(), LevelError> {
        let mut nbt_bytes = Vec::new();
        quartz_nbt::io::write_nbt(&mut nbt_bytes, None, nbt, Flavor::Uncompressed)
            .nbt_context("chunk")?;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&nbt_bytes)?;
        let compressed = encoder.finish()?;

        let sector_count = (compressed.len() + 5 + SECTOR_BYTES - 1) / SECTOR_BYTES;
        if sector_count > MAX_SECTOR_COUNT {
            return Err(LevelError::Unsupported("chunks larger than 255 sectors"));
        }

        self.slots[index] = Some(RawChunk {
            compression: CompressionType::Zlib as u8,
            payload: compressed,
        });
        self.timestamps[index] = now_seconds();
        Ok(())
    }

    /// Serialize the region: 8 KiB header, then each chunk padded to whole sectors.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LevelError> {
        let mut location_table = vec![0u8; SECTOR_BYTES];
        let mut timestamp_table = vec![0u8; SECTOR_BYTES];
        let mut data_sectors = Vec::new();

        let mut current_sector: u32 = 2;

        for (index, slot) in self.slots.iter().enumerate() {
            let raw = match slot {
                Some(raw) => raw,
                None => continue,
            };

            // Chunk header: 4-byte length (including compression byte) + 1-byte compression type
            let chunk_payload_len = raw.payload.len() as u32 + 1;
            let total_len = 4 + chunk_payload_len as usize;
            let sector_count = (total_len + SECTOR_BYTES - 1) / SECTOR_BYTES;
            if sector_count > MAX_SECTOR_COUNT {
                return Err(LevelError::Unsupported("chunks larger than 255 sectors"));
            }

            let loc_offset = index * 4;
            location_table[loc_offset] = ((current_sector >> 16) & 0xFF) as u8;
            location_table[loc_offset + 1] = ((current_sector >> 8) & 0xFF) as u8;
            location_table[loc_offset + 2] = (current_sector & 0xFF) as u8;
            location_table[loc_offset + 3] = sector_count as u8;
            timestamp_table[loc_offset..loc_offset + 4]
                .copy_from_slice(&self.timestamps[index].to_be_bytes());

            let mut chunk_sector = Vec::with_capacity(sector_count * SECTOR_BYTES);
            chunk_sector.extend_from_slice(&chunk_payload_len.to_be_bytes());
            chunk_sector.push(raw.compression);
            chunk_sector.extend_from_slice(&raw.payload);

            // Pad to 4KiB boundary
            chunk_sector.resize(sector_count * SECTOR_BYTES, 0);

            data_sectors.extend_from_slice(&chunk_sector);
            current_sector += sector_count as u32;
        }

        let mut result = Vec::with_capacity(HEADER_BYTES + data_sectors.len());
        result.extend_from_slice(&location_table);
        result.extend_from_slice(&timestamp_table);
        result.extend_from_slice(&data_sectors);
        Ok(result)
    }
}

fn decompress_chunk(data: &[u8], compression: CompressionType) -> Result<Vec<u8>, LevelError> {
    let mut decompressed = Vec::new();
    match compression {
        CompressionType::Zlib => {
            let mut decoder = ZlibDecoder::new(data);
            decoder.read_to_end(&mut decompressed)?;
        }
        CompressionType::Gzip => {
            let mut decoder = GzDecoder::new(data);
            decoder.read_to_end(&mut decompressed)?;
        }
        CompressionType::Uncompressed => {
            decompressed = data.to_vec();
        }
        CompressionType::Lz4 => {
            return Err(LevelError::Unsupported("LZ4 chunk compression"));
        }
    }
    Ok(decompressed)
}

// ─── Chunk sections ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ChunkSection {
    pub y: i8,
    pub palette: Vec<BlockState>,
    /// 4096 entries (16x16x16, index `y * 256 + z * 16 + x`), each an index into `palette`.
    pub block_states: Vec<u16>,
    /// `biomes`, light arrays and anything else stored next to `block_states`.
    pub extra: NbtCompound,
    edited: bool,
}

impl ChunkSection {
    /// An all-air section with a plains biome.
    pub fn empty(y: i8) -> Self {
        let mut biomes = NbtCompound::new();
        biomes.insert(
            "palette",
            NbtTag::List(NbtList::from(vec![NbtTag::String(
                "minecraft:plains".to_string(),
            )])),
        );
        let mut extra = NbtCompound::new();
        extra.insert("biomes", NbtTag::Compound(biomes));

        ChunkSection {
            y,
            palette: vec![BlockState::air()],
            block_states: vec![0; SECTION_VOLUME],
            extra,
            edited: false,
        }
    }

    #[inline]
    fn local_index(lx: usize, ly: usize, lz: usize) -> usize {
        ly * 256 + lz * 16 + lx
    }

    pub fn is_edited(&self) -> bool {
        self.edited
    }

    pub fn get(&self, lx: usize, ly: usize, lz: usize) -> &BlockState {
        let palette_index = self.block_states[Self::local_index(lx, ly, lz)] as usize;
        // Decoding guarantees every index is inside the palette.
        &self.palette[palette_index]
    }

    pub fn set(&mut self, lx: usize, ly: usize, lz: usize, block: &BlockState) {
        let palette_index = match self.palette.iter().position(|p| p == block) {
            Some(i) => i,
            None => {
                self.palette.push(block.clone());
                self.palette.len() - 1
            }
        } as u16;

        let index = Self::local_index(lx, ly, lz);
        if self.block_states[index] != palette_index {
            self.block_states[index] = palette_index;
            self.edited = true;
        }
    }

    /// Drop palette entries no block refers to any more.
    pub fn compact_palette(&mut self) {
        let mut used = vec![false; self.palette.len()];
        for &index in &self.block_states {
            used[index as usize] = true;
        }
        if used.iter().all(|&u| u) {
            return;
        }

        let mut remap = vec![0u16; self.palette.len()];
        let mut palette = Vec::with_capacity(self.palette.len());
        for (old, state) in self.palette.drain(..).enumerate() {
            if used[old] {
                remap[old] = palette.len() as u16;
                palette.push(state);
            }
        }
        for index in self.block_states.iter_mut() {
            *index = remap[*index as usize];
        }
        self.palette = palette;
    }

    pub fn is_all_air(&self) -> bool {
        self.palette.iter().all(|state| state.is_air())
    }

    fn from_nbt(section_nbt: &NbtCompound) -> Result<Self, LevelError> {
        let y = section_nbt
            .get::<_, i8>("Y")
            .map_err(|e| LevelError::malformed("chunk section", format!("missing Y: {}", e)))?;

        let mut extra = NbtCompound::new();
        for (key, value) in section_nbt.inner() {
            match key.as_str() {
                "Y" | "block_states" => continue,
                _ => {
                    extra.insert(key.clone(), value.clone());
                }
            }
        }

        // No block_states = all air section
        let block_states_compound = match section_nbt.get::<_, &NbtCompound>("block_states") {
            Ok(bs) => bs,
            Err(_) => {
                return Ok(ChunkSection {
                    y,
                    palette: vec![BlockState::air()],
                    block_states: vec![0; SECTION_VOLUME],
                    extra,
                    edited: false,
                });
            }
        };

        let mut palette = Vec::new();
        if let Ok(palette_list) = block_states_compound.get::<_, &NbtList>("palette") {
            for tag in palette_list.iter() {
                if let NbtTag::Compound(compound) = tag {
                    palette.push(BlockState::from_nbt(compound)?);
                }
            }
        }
        if palette.is_empty() {
            palette.push(BlockState::air());
        }

        let block_states = if palette.len() <= 1 {
            vec![0u16; SECTION_VOLUME]
        } else {
            match block_states_compound.get::<_, &[i64]>("data") {
                Ok(packed_data) => unpack_block_states(packed_data, palette.len()),
                Err(_) => vec![0u16; SECTION_VOLUME],
            }
        };
        if let Some(bad) = block_states.iter().find(|&&i| i as usize >= palette.len()) {
            return Err(LevelError::malformed(
                "chunk section",
                format!(
                    "section {} refers to palette entry {} of {}",
                    y,
                    bad,
                    palette.len()
                ),
            ));
        }

        Ok(ChunkSection {
            y,
            palette,
            block_states,
            extra,
            edited: false,
        })
    }

    fn to_nbt(&self) -> NbtCompound {
        let mut section_nbt = NbtCompound::new();
        for (key, value) in self.extra.inner() {
            // Light arrays are stale after an edit; the game relights chunks flagged with isLightOn = 0.
            if self.edited && (key == "BlockLight" || key == "SkyLight") {
                continue;
            }
            section_nbt.insert(key.clone(), value.clone());
        }
        section_nbt.insert("Y", NbtTag::Byte(self.y));

        let mut block_states_compound = NbtCompound::new();
        let palette_nbt: Vec<NbtTag> = self.palette.iter().map(|bs| bs.to_nbt()).collect();
        block_states_compound.insert("palette", NbtTag::List(NbtList::from(palette_nbt)));
        if self.palette.len() > 1 {
            let packed = pack_block_states(&self.block_states, self.palette.len());
            block_states_compound.insert("data", NbtTag::LongArray(packed));
        }
        section_nbt.insert("block_states", NbtTag::Compound(block_states_compound));

        section_nbt
    }
}

/// Unpack block states from Minecraft's chunk format.
/// Entries never span two longs.
/// Each i64 holds floor(64/bits_per_entry) entries, minimum 4 bits per entry.
pub fn unpack_block_states(packed: &[i64], palette_size: usize) -> Vec<u16> {
    let bits_per_entry = bits_for_palette(palette_size);

    let entries_per_long = 64 / bits_per_entry;
    let mask = (1u64 << bits_per_entry) - 1;

    let mut result = Vec::with_capacity(SECTION_VOLUME);

    for &long_val in packed {
        let long_unsigned = long_val as u64;
        for j in 0..entries_per_long {
            if result.len() >= SECTION_VOLUME {
                break;
            }
            let index = (long_unsigned >> (j * bits_per_entry)) & mask;
            result.push(index as u16);
        }
    }

    result.resize(SECTION_VOLUME, 0);
    result
}

/// Pack block states into Minecraft's chunk format.
/// Entries do NOT span across long boundaries.
pub fn pack_block_states(indices: &[u16], palette_size: usize) -> Vec<i64> {
    if palette_size <= 1 {
        return Vec::new();
    }

    let bits_per_entry = bits_for_palette(palette_size);

    let entries_per_long = 64 / bits_per_entry;
    let num_longs = (SECTION_VOLUME + entries_per_long as usize - 1) / entries_per_long as usize;
    let mask = (1u64 << bits_per_entry) - 1;

    let mut packed = vec![0i64; num_longs];

    for (i, &index) in indices.iter().enumerate().take(SECTION_VOLUME) {
        let long_index = i / entries_per_long as usize;
        let bit_offset = (i % entries_per_long as usize) as u32 * bits_per_entry;
        let value = (index as u64) & mask;
        packed[long_index] |= (value << bit_offset) as i64;
    }

    packed
}

fn bits_for_palette(palette_size: usize) -> u32 {
    let needed = usize::BITS - (palette_size.max(1) - 1).leading_zeros();
    needed.max(4)
}

// ─── Chunks ─────────────────────────────────────────────────────────────────

/// A 1.18+ block chunk. Tags this codec does not interpret are kept in
/// `extra` and written back unchanged.
#[derive(Debug, Clone)]
pub struct ChunkData {
    pub x: i32,
    pub z: i32,
    pub data_version: i32,
    pub status: String,
    /// Minimum section Y (e.g. -4 for overworld 1.18+)
    pub y_pos: i32,
    pub sections: Vec<ChunkSection>,
    pub block_entities: Vec<BlockEntity>,
    pub extra: NbtCompound,
    dirty: bool,
}

impl ChunkData {
    /// A generated-looking chunk with no sections; blocks are added on demand.
    pub fn new_empty(x: i32, z: i32, data_version: i32, y_pos: i32) -> Self {
        ChunkData {
            x,
            z,
            data_version,
            status: "minecraft:full".to_string(),
            y_pos,
            sections: Vec::new(),
            block_entities: Vec::new(),
            extra: NbtCompound::new(),
            dirty: true,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn section(&self, section_y: i8) -> Option<&ChunkSection> {
        self.sections.iter().find(|s| s.y == section_y)
    }

    fn section_mut(&mut self, section_y: i8) -> &mut ChunkSection {
        let position = match self.sections.iter().position(|s| s.y == section_y) {
            Some(i) => i,
            None => {
                self.sections.push(ChunkSection::empty(section_y));
                self.sections.sort_by_key(|s| s.y);
                // The section is present after the push.
                self.sections
                    .iter()
                    .position(|s| s.y == section_y)
                    .unwrap_or(self.sections.len() - 1)
            }
        };
        &mut self.sections[position]
    }

    fn section_y(y: i32) -> Result<i8, LevelError> {
        i8::try_from(floor_div(y, 16)).map_err(|_| LevelError::CoordinateOverflow("section index"))
    }

    /// Block at absolute coordinates, `None` when that section is not stored.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Option<&BlockState> {
        let section = self.section(Self::section_y(y).ok()?)?;
        Some(section.get(
            floor_mod(x, 16) as usize,
            floor_mod(y, 16) as usize,
            floor_mod(z, 16) as usize,
        ))
    }

    pub fn set_block(&mut self, x: i32, y: i32, z: i32, block: &BlockState) -> Result<(), LevelError> {
        let section_y = Self::section_y(y)?;
        let section = self.section_mut(section_y);
        section.set(
            floor_mod(x, 16) as usize,
            floor_mod(y, 16) as usize,
            floor_mod(z, 16) as usize,
            block,
        );
        if section.is_edited() {
            self.dirty = true;
        }
        Ok(())
    }

    pub fn block_entity(&self, pos: BlockPos) -> Option<&BlockEntity> {
        self.block_entities.iter().find(|be| be.position == pos)
    }

    pub fn set_block_entity(&mut self, block_entity: BlockEntity) {
        self.block_entities
            .retain(|be| be.position != block_entity.position);
        self.block_entities.push(block_entity);
        self.dirty = true;
    }

    pub fn remove_block_entity(&mut self, pos: BlockPos) -> bool {
        let before = self.block_entities.len();
        self.block_entities.retain(|be| be.position != pos);
        let removed = self.block_entities.len() != before;
        if removed {
            self.dirty = true;
        }
        removed
    }

    pub fn from_nbt(nbt: &NbtCompound, chunk_x: i32, chunk_z: i32) -> Result<Self, LevelError> {
        if nbt.contains_key("Level") {
            return Err(LevelError::Unsupported("pre-1.18 chunk layout"));
        }
        let data_version = nbt.get::<_, i32>("DataVersion").map_err(|e| {
            LevelError::malformed(
                "chunk",
                format!("chunk {}, {} has no DataVersion: {}", chunk_x, chunk_z, e),
            )
        })?;

        let status = nbt
            .get::<_, &str>("Status")
            .map(|s| s.to_string())
            .unwrap_or_else(|_| "minecraft:full".to_string());

        let x_pos = nbt.get::<_, i32>("xPos").unwrap_or(chunk_x);
        let z_pos = nbt.get::<_, i32>("zPos").unwrap_or(chunk_z);
        if (x_pos, z_pos) != (chunk_x, chunk_z) {
            return Err(LevelError::malformed(
                "chunk",
                format!(
                    "slot for chunk {}, {} holds chunk {}, {}",
                    chunk_x, chunk_z, x_pos, z_pos
                ),
            ));
        }
        let y_pos = nbt.get::<_, i32>("yPos").unwrap_or(-4);

        let mut sections = Vec::new();
        if let Ok(section_list) = nbt.get::<_, &NbtList>("sections") {
            for section_tag in section_list.iter() {
                if let NbtTag::Compound(section_nbt) = section_tag {
                    sections.push(ChunkSection::from_nbt(section_nbt)?);
                }
            }
        }
        sections.sort_by_key(|s| s.y);

        let mut block_entities = Vec::new();
        if let Ok(be_list) = nbt.get::<_, &NbtList>("block_entities") {
            for be_tag in be_list.iter() {
                if let NbtTag::Compound(be_nbt) = be_tag {
                    block_entities.push(BlockEntity::from_nbt(be_nbt)?);
                }
            }
        }

        let mut extra = NbtCompound::new();
        for (key, value) in nbt.inner() {
            match key.as_str() {
                "DataVersion" | "Status" | "xPos" | "yPos" | "zPos" | "sections"
                | "block_entities" => continue,
                _ => {
                    extra.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(ChunkData {
            x: x_pos,
            z: z_pos,
            data_version,
            status,
            y_pos,
            sections,
            block_entities,
            extra,
            dirty: false,
        })
    }

    /// Encode for saving. Edited sections get compacted palettes. A dirty
    /// chunk loses its heightmaps and is flagged for relighting, so the game
    /// rebuilds both on load.
    pub fn to_nbt(&mut self) -> NbtCompound {
        for section in self.sections.iter_mut().filter(|s| s.is_edited()) {
            section.compact_palette();
        }

        let mut root = NbtCompound::new();
        for (key, value) in self.extra.inner() {
            if self.dirty && key == "Heightmaps" {
                continue;
            }
            root.insert(key.clone(), value.clone());
        }
        root.insert("DataVersion", NbtTag::Int(self.data_version));
        root.insert("xPos", NbtTag::Int(self.x));
        root.insert("yPos", NbtTag::Int(self.y_pos));
        root.insert("zPos", NbtTag::Int(self.z));
        root.insert("Status", NbtTag::String(self.status.clone()));

        let section_list: Vec<NbtTag> = self
            .sections
            .iter()
            .map(|section| NbtTag::Compound(section.to_nbt()))
            .collect();
        root.insert("sections", NbtTag::List(NbtList::from(section_list)));

        let be_list: Vec<NbtTag> = self
            .block_entities
            .iter()
            .map(|be| NbtTag::Compound(be.to_nbt()))
            .collect();
        root.insert("block_entities", NbtTag::List(NbtList::from(be_list)));

        if self.dirty {
            // isLightOn = 0: tell Minecraft to recalculate lighting on load
            root.insert("isLightOn", NbtTag::Byte(0));
        }

        root
    }
}

// ─── Entity chunks (entities/r.x.z.mca) ─────────────────────────────────────

/// Chunk of an entity region file:
/// `{ DataVersion: int, Position: int[2], Entities: list<compound> }`.
#[derive(Debug, Clone)]
pub struct EntityChunkData {
    pub chunk_x: i32,
    pub chunk_z: i32,
    pub data_version: i32,
    pub entities: Vec<Entity>,
    dirty: bool,
}

impl EntityChunkData {
    pub fn new_empty(chunk_x: i32, chunk_z: i32, data_version: i32) -> Self {
        EntityChunkData {
            chunk_x,
            chunk_z,
            data_version,
            entities: Vec::new(),
            dirty: false,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn push(&mut self, entity: Entity) {
        self.entities.push(entity);
        self.dirty = true;
    }

    pub fn from_nbt(nbt: &NbtCompound, chunk_x: i32, chunk_z: i32) -> Result<Self, LevelError> {
        let (chunk_x, chunk_z) = match nbt.get::<_, &[i32]>("Position") {
            Ok(pos) if pos.len() >= 2 => (pos[0], pos[1]),
            _ => (chunk_x, chunk_z),
        };
        let data_version = nbt.get::<_, i32>("DataVersion").unwrap_or(0);

        let mut entities = Vec::new();
        if let Ok(entity_list) = nbt.get::<_, &NbtList>("Entities") {
            for entity_tag in entity_list.iter() {
                if let NbtTag::Compound(entity_nbt) = entity_tag {
                    entities.push(Entity::from_nbt(entity_nbt)?);
                }
            }
        }

        Ok(EntityChunkData {
            chunk_x,
            chunk_z,
            data_version,
            entities,
            dirty: false,
        })
    }

    pub fn to_nbt(&self) -> NbtCompound {
        let mut root = NbtCompound::new();
        root.insert("DataVersion", NbtTag::Int(self.data_version));
        root.insert(
            "Position",
            NbtTag::IntArray(vec![self.chunk_x, self.chunk_z]),
        );
        let entity_tags: Vec<NbtTag> = self.entities.iter().map(|e| e.to_nbt()).collect();
        root.insert("Entities", NbtTag::List(NbtList::from(entity_tags)));
        root
    }
}

// ─── Utility ────────────────────────────────────────────────────────────────

/// Floor division that handles negative numbers correctly.
/// Rust's integer division truncates toward zero, but we need toward negative infinity.
pub fn floor_div(a: i32, b: i32) -> i32 {
    a.div_euclid(b)
}

/// Floor modulo that handles negative numbers correctly.
pub fn floor_mod(a: i32, b: i32) -> i32 {
    a.rem_euclid(b)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
