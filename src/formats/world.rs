//! Anvil world directories opened as a [`Level`].
//!
//! Region files are read on first access and chunks are decoded one at a time.
//! `save` rewrites only the region files that hold changed chunks, each through
//! a temporary file and a rename.

use crate::block_entity::BlockEntity;
use crate::entity::Entity;
use crate::error::{LevelError, NbtContext};
use crate::formats::anvil::{floor_div, ChunkData, EntityChunkData, McaFile};
use crate::level::{Dimension, Level};
use crate::selection::{BlockPos, SelectionBox, SelectionGroup};
use crate::BlockState;
use flate2::read::GzDecoder;
use quartz_nbt::io::Flavor;
use quartz_nbt::NbtCompound;
use rustc_hash::FxHashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// First DataVersion with the 1.18 chunk layout (21w43a).
pub const MIN_DATA_VERSION: i32 = 2860;

/// Blocks renamed after 1.18: current name, name in older worlds, first DataVersion with the current name.
const RENAMED_BLOCKS: [(&str, &str, i32); 1] = [("minecraft:short_grass", "minecraft:grass", 3698)];

/// `block` under the name a world of `data_version` knows it by, `None` when unchanged.
pub fn block_for_data_version(block: &BlockState, data_version: i32) -> Option<BlockState> {
    RENAMED_BLOCKS
        .iter()
        .find(|(current, _, since)| block.name == *current && data_version < *since)
        .map(|(_, older, _)| {
            let mut renamed = block.clone();
            renamed.name = (*older).into();
            renamed
        })
}

const OVERWORLD_HEIGHT: (i32, i32) = (-64, 320);
const DEFAULT_HEIGHT: (i32, i32) = (0, 256);
const REGION_BLOCKS: i32 = 512;

/// Lazily loaded region file and the chunks decoded from it so far.
struct LoadedRegion<C> {
    file: McaFile,
    chunks: FxHashMap<usize, C>,
}

impl<C> LoadedRegion<C> {
    fn read(path: &Path, region_x: i32, region_z: i32) -> Result<Self, LevelError> {
        let file = if path.is_file() {
            let data = fs::read(path)?;
            debug!("Read region {} ({} bytes)", path.display(), data.len());
            McaFile::from_bytes(&data, region_x, region_z)?
        } else {
            McaFile::new(region_x, region_z)
        };
        Ok(LoadedRegion {
            file,
            chunks: FxHashMap::default(),
        })
    }
}

/// A region cache, generic over block chunks and entity chunks.
struct RegionStore<C> {
    directory: PathBuf,
    regions: FxHashMap<(i32, i32), LoadedRegion<C>>,
    decode: fn(&NbtCompound, i32, i32) -> Result<C, LevelError>,
    encode: fn(&mut C) -> NbtCompound,
    is_dirty: fn(&C) -> bool,
}

impl<C> RegionStore<C> {
    fn region_path(&self, region_x: i32, region_z: i32) -> PathBuf {
        self.directory
            .join(format!("r.{}.{}.mca", region_x, region_z))
    }

    fn region(&mut self, chunk_x: i32, chunk_z: i32) -> Result<&mut LoadedRegion<C>, LevelError> {
        let key = (floor_div(chunk_x, 32), floor_div(chunk_z, 32));
        if !self.regions.contains_key(&key) {
            let region = LoadedRegion::read(&self.region_path(key.0, key.1), key.0, key.1)?;
            self.regions.insert(key, region);
        }
        self.regions
            .get_mut(&key)
            .ok_or_else(|| LevelError::malformed("region", "region cache lost an entry"))
    }

    /// Decode a chunk on first access; `None` when the region has no such chunk.
    fn chunk(&mut self, chunk_x: i32, chunk_z: i32) -> Result<Option<&mut C>, LevelError> {
        let decode = self.decode;
        let region = self.region(chunk_x, chunk_z)?;
        let index = McaFile::index(chunk_x, chunk_z);
        if !region.chunks.contains_key(&index) {
            match region.file.read_nbt(index)? {
                Some(nbt) => {
                    let chunk = decode(&nbt, chunk_x, chunk_z)?;
                    region.chunks.insert(index, chunk);
                }
                None => return Ok(None),
            }
        }
        Ok(region.chunks.get_mut(&index))
    }

    fn chunk_or_insert_with(
        &mut self,
        chunk_x: i32,
        chunk_z: i32,
        create: impl FnOnce() -> C,
    ) -> Result<&mut C, LevelError> {
        self.chunk(chunk_x, chunk_z)?;
        let region = self.region(chunk_x, chunk_z)?;
        Ok(region
            .chunks
            .entry(McaFile::index(chunk_x, chunk_z))
            .or_insert_with(create))
    }

    /// Write every region holding a dirty chunk. Returns the number of chunks written.
    fn save(&mut self) -> Result<usize, LevelError> {
        let mut written = 0;
        let mut keys: Vec<(i32, i32)> = self.regions.keys().copied().collect();
        keys.sort();

        for key in keys {
            let path = self.region_path(key.0, key.1);
            let (encode, is_dirty) = (self.encode, self.is_dirty);
            let region = match self.regions.get_mut(&key) {
                Some(region) => region,
                None => continue,
            };

            let mut dirty: Vec<usize> = region
                .chunks
                .iter()
                .filter(|(_, chunk)| is_dirty(chunk))
                .map(|(index, _)| *index)
                .collect();
            if dirty.is_empty() {
                continue;
            }
            dirty.sort_unstable();

            for index in &dirty {
                if let Some(chunk) = region.chunks.get_mut(index) {
                    let nbt = encode(chunk);
                    region.file.write_nbt(*index, &nbt)?;
                }
            }
            write_atomically(&path, &region.file.to_bytes()?)?;
            debug!("Wrote {} chunks to {}", dirty.len(), path.display());

            // The file now holds these chunks; drop them so a later read decodes the saved state.
            for index in &dirty {
                region.chunks.remove(index);
            }
            written += dirty.len();
        }
        Ok(written)
    }
}

fn write_atomically(path: &Path, data: &[u8]) -> Result<(), LevelError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(data)?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// The region, entity and height data of one dimension.
struct DimensionStore {
    dimension: Dimension,
    directory: PathBuf,
    height: (i32, i32),
    blocks: RegionStore<ChunkData>,
    entities: RegionStore<EntityChunkData>,
}

impl DimensionStore {
    fn new(dimension: Dimension, directory: PathBuf) -> Self {
        let height = if dimension.as_str() == Dimension::OVERWORLD {
            OVERWORLD_HEIGHT
        } else {
            DEFAULT_HEIGHT
        };
        DimensionStore {
            dimension,
            blocks: RegionStore {
                directory: directory.join("region"),
                regions: FxHashMap::default(),
                decode: ChunkData::from_nbt,
                encode: ChunkData::to_nbt,
                is_dirty: ChunkData::is_dirty,
            },
            entities: RegionStore {
                directory: directory.join("entities"),
                regions: FxHashMap::default(),
                decode: EntityChunkData::from_nbt,
                encode: |chunk| chunk.to_nbt(),
                is_dirty: EntityChunkData::is_dirty,
            },
            directory,
            height,
        }
    }

    fn min_section(&self) -> i32 {
        floor_div(self.height.0, 16)
    }

    fn check_height(&self, y: i32) -> Result<(), LevelError> {
        if y < self.height.0 || y >= self.height.1 {
            return Err(LevelError::OutOfBuildHeight {
                low: y,
                high: y + 1,
                min_y: self.height.0,
                max_y: self.height.1,
            });
        }
        Ok(())
    }
}

/// `r.0.-1.mca` (optionally with a directory prefix) to `(0, -1)`.
pub fn parse_region_filename(name: &str) -> Option<(i32, i32)> {
    let basename = name.rsplit('/').next().unwrap_or(name);
    let basename = basename.rsplit('\\').next().unwrap_or(basename);
    let parts: Vec<&str> = basename.split('.').collect();
    if parts.len() == 4 && parts[0] == "r" && parts[3] == "mca" {
        let x = parts[1].parse::<i32>().ok()?;
        let z = parts[2].parse::<i32>().ok()?;
        Some((x, z))
    } else {
        None
    }
}

/// An open Anvil (1.18+) world directory.
pub struct AnvilWorld {
    path: PathBuf,
    data_version: i32,
    level_name: Option<String>,
    dimensions: Vec<Dimension>,
    stores: Vec<DimensionStore>,
    session_lock: Option<File>,
    closed: bool,
}

impl AnvilWorld {
    /// Open the world at `path`: parse `level.dat`, discover dimensions and
    /// claim `session.lock`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let path = path.as_ref().to_path_buf();
        let level_dat = path.join("level.dat");
        if !level_dat.is_file() {
            return Err(LevelError::UnsupportedFormat(format!(
                "{} has no level.dat",
                path.display()
            )));
        }

        let data = fs::read(&level_dat)?;
        let (root, _) =
            quartz_nbt::io::read_nbt(&mut GzDecoder::new(data.as_slice()), Flavor::Uncompressed)
                .nbt_context("level.dat")?;
        let level = root
            .get::<_, &NbtCompound>("Data")
            .map_err(|e| LevelError::malformed("level.dat", format!("missing Data: {}", e)))?;
        let data_version = level.get::<_, i32>("DataVersion").map_err(|e| {
            LevelError::malformed("level.dat", format!("missing DataVersion: {}", e))
        })?;
        if data_version < MIN_DATA_VERSION {
            return Err(LevelError::UnsupportedFormat(format!(
                "world DataVersion {} predates the 1.18 chunk format ({})",
                data_version, MIN_DATA_VERSION
            )));
        }
        let level_name = level.get::<_, &str>("LevelName").ok().map(str::to_string);

        let mut stores = vec![DimensionStore::new(Dimension::overworld(), path.clone())];
        for (dimension, folder) in [(Dimension::nether(), "DIM-1"), (Dimension::end(), "DIM1")] {
            let directory = path.join(folder);
            if directory.join("region").is_dir() {
                stores.push(DimensionStore::new(dimension, directory));
            }
        }
        let dimensions = stores.iter().map(|s| s.dimension.clone()).collect();

        let mut session_lock = File::create(path.join("session.lock"))?;
        session_lock.write_all("☃".as_bytes())?;
        session_lock.flush()?;

        info!(
            "Opened world {} ({}, DataVersion {}, {} dimensions)",
            path.display(),
            level_name.as_deref().unwrap_or("unnamed"),
            data_version,
            stores.len()
        );

        Ok(AnvilWorld {
            path,
            data_version,
            level_name,
            dimensions,
            stores,
            session_lock: Some(session_lock),
            closed: false,
        })
    }

    pub fn data_version(&self) -> i32 {
        self.data_version
    }

    pub fn level_name(&self) -> Option<&str> {
        self.level_name.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn store(&self, dimension: &Dimension) -> Result<&DimensionStore, LevelError> {
        if self.closed {
            return Err(LevelError::Closed);
        }
        self.stores
            .iter()
            .find(|s| &s.dimension == dimension)
            .ok_or_else(|| LevelError::UnknownDimension(dimension.to_string()))
    }

    fn store_mut(&mut self, dimension: &Dimension) -> Result<&mut DimensionStore, LevelError> {
        if self.closed {
            return Err(LevelError::Closed);
        }
        self.stores
            .iter_mut()
            .find(|s| &s.dimension == dimension)
            .ok_or_else(|| LevelError::UnknownDimension(dimension.to_string()))
    }

    fn chunk_for_write(
        &mut self,
        dimension: &Dimension,
        pos: BlockPos,
    ) -> Result<&mut ChunkData, LevelError> {
        let data_version = self.data_version;
        let store = self.store_mut(dimension)?;
        store.check_height(pos.1)?;
        let (chunk_x, chunk_z) = (floor_div(pos.0, 16), floor_div(pos.2, 16));
        let y_pos = store.min_section();
        store.blocks.chunk_or_insert_with(chunk_x, chunk_z, || {
            debug!("Creating chunk {}, {}", chunk_x, chunk_z);
            ChunkData::new_empty(chunk_x, chunk_z, data_version, y_pos)
        })
    }
}

impl Level for AnvilWorld {
    fn path(&self) -> &Path {
        &self.path
    }

    fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// One box per region file on disk, spanning the build height.
    fn bounds(&self, dimension: &Dimension) -> Result<SelectionGroup, LevelError> {
        let store = self.store(dimension)?;
        let mut regions = Vec::new();
        if store.blocks.directory.is_dir() {
            for entry in fs::read_dir(&store.blocks.directory)? {
                let entry = entry?;
                if let Some(coords) = entry.file_name().to_str().and_then(parse_region_filename) {
                    regions.push(coords);
                }
            }
        }
        regions.sort();

        let mut group = SelectionGroup::new();
        let (min_y, max_y) = store.height;
        for (rx, rz) in regions {
            group.push(SelectionBox::new(
                (rx * REGION_BLOCKS, min_y, rz * REGION_BLOCKS),
                ((rx + 1) * REGION_BLOCKS, max_y, (rz + 1) * REGION_BLOCKS),
            ));
        }
        Ok(group)
    }

    fn height_range(&self, dimension: &Dimension) -> Option<(i32, i32)> {
        self.stores
            .iter()
            .find(|s| &s.dimension == dimension)
            .map(|s| s.height)
    }

    fn block(
        &mut self,
        dimension: &Dimension,
        pos: BlockPos,
    ) -> Result<Option<BlockState>, LevelError> {
        let store = self.store_mut(dimension)?;
        if store.check_height(pos.1).is_err() {
            return Ok(None);
        }
        let chunk = store
            .blocks
            .chunk(floor_div(pos.0, 16), floor_div(pos.2, 16))?;
        Ok(chunk.and_then(|c| c.get_block(pos.0, pos.1, pos.2).cloned()))
    }

    fn set_block(
        &mut self,
        dimension: &Dimension,
        pos: BlockPos,
        block: &BlockState,
    ) -> Result<(), LevelError> {
        let renamed = block_for_data_version(block, self.data_version);
        let block = renamed.as_ref().unwrap_or(block);
        self.chunk_for_write(dimension, pos)?
            .set_block(pos.0, pos.1, pos.2, block)
    }

    fn block_entity(
        &mut self,
        dimension: &Dimension,
        pos: BlockPos,
    ) -> Result<Option<BlockEntity>, LevelError> {
        let store = self.store_mut(dimension)?;
        let chunk = store
            .blocks
            .chunk(floor_div(pos.0, 16), floor_div(pos.2, 16))?;
        Ok(chunk.and_then(|c| c.block_entity(pos).cloned()))
    }

    fn set_block_entity(
        &mut self,
        dimension: &Dimension,
        block_entity: BlockEntity,
    ) -> Result<(), LevelError> {
        let chunk = self.chunk_for_write(dimension, block_entity.position)?;
        chunk.set_block_entity(block_entity);
        Ok(())
    }

    fn remove_block_entity(
        &mut self,
        dimension: &Dimension,
        pos: BlockPos,
    ) -> Result<(), LevelError> {
        let store = self.store_mut(dimension)?;
        if let Some(chunk) = store
            .blocks
            .chunk(floor_div(pos.0, 16), floor_div(pos.2, 16))?
        {
            chunk.remove_block_entity(pos);
        }
        Ok(())
    }

    fn entities_in(
        &mut self,
        dimension: &Dimension,
        selection: &SelectionBox,
    ) -> Result<Vec<Entity>, LevelError> {
        let store = self.store_mut(dimension)?;
        let mut found = Vec::new();
        if selection.is_empty() {
            return Ok(found);
        }

        let (min, max) = (selection.min, selection.max);
        for chunk_z in floor_div(min.2, 16)..=floor_div(max.2 - 1, 16) {
            for chunk_x in floor_div(min.0, 16)..=floor_div(max.0 - 1, 16) {
                if let Some(chunk) = store.entities.chunk(chunk_x, chunk_z)? {
                    found.extend(
                        chunk
                            .entities
                            .iter()
                            .filter(|e| selection.contains_point(e.position))
                            .cloned(),
                    );
                }
            }
        }
        Ok(found)
    }

    fn add_entity(&mut self, dimension: &Dimension, entity: Entity) -> Result<(), LevelError> {
        let data_version = self.data_version;
        let store = self.store_mut(dimension)?;
        let block_x = entity.position.0.floor() as i32;
        let block_z = entity.position.2.floor() as i32;
        let (chunk_x, chunk_z) = (floor_div(block_x, 16), floor_div(block_z, 16));
        let chunk = store.entities.chunk_or_insert_with(chunk_x, chunk_z, || {
            EntityChunkData::new_empty(chunk_x, chunk_z, data_version)
        })?;
        chunk.push(entity);
        Ok(())
    }

    fn save(&mut self) -> Result<(), LevelError> {
        if self.closed {
            return Err(LevelError::Closed);
        }
        let mut chunks = 0;
        let mut entity_chunks = 0;
        for store in &mut self.stores {
            let written = store.blocks.save()?;
            let written_entities = store.entities.save()?;
            if written + written_entities > 0 {
                debug!(
                    "Saved {} in {}",
                    store.dimension,
                    store.directory.display()
                );
            }
            chunks += written;
            entity_chunks += written_entities;
        }
        info!(
            "Saved world {}: {} chunks, {} entity chunks rewritten",
            self.path.display(),
            chunks,
            entity_chunks
        );
        Ok(())
    }

    fn close(&mut self) -> Result<(), LevelError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stores.clear();
        // Dropping the handle releases session.lock.
        self.session_lock = None;
        debug!("Closed world {}", self.path.display());
        Ok(())
    }
}
