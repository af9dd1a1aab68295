use crate::block_entity::BlockEntity;
use crate::entity::Entity;
use crate::error::LevelError;
use crate::level::{Dimension, Level};
use crate::selection::{BlockPos, SelectionBox, SelectionGroup};
use crate::BlockState;
use rustc_hash::FxHashMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Dense block grid with a palette, addressed in local coordinates
/// `0..width`, `0..height`, `0..length`.
#[derive(Debug, Clone)]
pub struct Schematic {
    pub name: String,
    /// `(width, height, length)` along x, y, z.
    pub size: (i32, i32, i32),
    pub data_version: Option<i32>,
    blocks: Vec<u32>,
    palette: Vec<BlockState>,
    palette_index: FxHashMap<BlockState, u32>,
    pub block_entities: HashMap<BlockPos, BlockEntity>,
    pub entities: Vec<Entity>,
}

impl Schematic {
    /// An all-air schematic. Negative extents are clamped to zero.
    pub fn new(name: impl Into<String>, size: (i32, i32, i32)) -> Self {
        let size = (size.0.max(0), size.1.max(0), size.2.max(0));
        let volume = size.0 as usize * size.1 as usize * size.2 as usize;

        let air = BlockState::air();
        let mut palette_index = FxHashMap::default();
        palette_index.insert(air.clone(), 0);

        Schematic {
            name: name.into(),
            size,
            data_version: None,
            blocks: vec![0; volume],
            palette: vec![air],
            palette_index,
            block_entities: HashMap::new(),
            entities: Vec::new(),
        }
    }

    pub fn volume(&self) -> usize {
        self.blocks.len()
    }

    pub fn palette(&self) -> &[BlockState] {
        &self.palette
    }

    pub fn get_or_insert_in_palette(&mut self, block: &BlockState) -> u32 {
        match self.palette_index.get(block) {
            Some(&index) => index,
            None => {
                let index = self.palette.len() as u32;
                self.palette.push(block.clone());
                self.palette_index.insert(block.clone(), index);
                index
            }
        }
    }

    #[inline(always)]
    pub fn is_in_bounds(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0 && y >= 0 && z >= 0 && x < self.size.0 && y < self.size.1 && z < self.size.2
    }

    /// Index of the MCEdit and Sponge layouts: `x + z * width + y * width * length`.
    #[inline(always)]
    pub fn coords_to_index(&self, x: i32, y: i32, z: i32) -> usize {
        let (w, _, l) = self.size;
        (x + z * w + y * w * l) as usize
    }

    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Option<&BlockState> {
        if !self.is_in_bounds(x, y, z) {
            return None;
        }
        let palette_index = self.blocks[self.coords_to_index(x, y, z)];
        self.palette.get(palette_index as usize)
    }

    /// Returns `false` when the position is outside the grid.
    pub fn set_block(&mut self, x: i32, y: i32, z: i32, block: &BlockState) -> bool {
        if !self.is_in_bounds(x, y, z) {
            return false;
        }
        let palette_index = self.get_or_insert_in_palette(block);
        let index = self.coords_to_index(x, y, z);
        self.blocks[index] = palette_index;
        true
    }

    /// Assign a palette index directly; used by readers that decode whole arrays.
    pub(crate) fn set_index(&mut self, index: usize, palette_index: u32) {
        self.blocks[index] = palette_index;
    }

    pub fn selection(&self) -> SelectionBox {
        SelectionBox::from_position_and_size((0, 0, 0), self.size)
    }

    pub fn count_non_air_blocks(&self) -> usize {
        self.blocks
            .iter()
            .filter(|&&index| !self.palette[index as usize].is_air())
            .count()
    }

    pub fn add_block_entity(&mut self, block_entity: BlockEntity) {
        self.block_entities
            .insert(block_entity.position, block_entity);
    }

    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }
}

/// A schematic file opened as a [`Level`] with the single dimension `main`.
pub struct SchematicLevel {
    path: PathBuf,
    dimensions: Vec<Dimension>,
    schematic: Schematic,
    closed: bool,
}

impl SchematicLevel {
    pub fn new(path: impl AsRef<Path>, schematic: Schematic) -> Self {
        SchematicLevel {
            path: path.as_ref().to_path_buf(),
            dimensions: vec![Dimension::structure()],
            schematic,
            closed: false,
        }
    }

    pub fn schematic(&self) -> &Schematic {
        &self.schematic
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check(&self, dimension: &Dimension) -> Result<(), LevelError> {
        if self.closed {
            return Err(LevelError::Closed);
        }
        if !self.dimensions.contains(dimension) {
            return Err(LevelError::UnknownDimension(dimension.to_string()));
        }
        Ok(())
    }
}

impl Level for SchematicLevel {
    fn path(&self) -> &Path {
        &self.path
    }

    fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    fn bounds(&self, dimension: &Dimension) -> Result<SelectionGroup, LevelError> {
        self.check(dimension)?;
        let selection = self.schematic.selection();
        if selection.is_empty() {
            Ok(SelectionGroup::new())
        } else {
            Ok(SelectionGroup::from_box(selection))
        }
    }

    fn height_range(&self, _dimension: &Dimension) -> Option<(i32, i32)> {
        Some((0, self.schematic.size.1))
    }

    fn block(
        &mut self,
        dimension: &Dimension,
        pos: BlockPos,
    ) -> Result<Option<BlockState>, LevelError> {
        self.check(dimension)?;
        Ok(self.schematic.get_block(pos.0, pos.1, pos.2).cloned())
    }

    fn set_block(
        &mut self,
        dimension: &Dimension,
        pos: BlockPos,
        block: &BlockState,
    ) -> Result<(), LevelError> {
        self.check(dimension)?;
        if self.schematic.set_block(pos.0, pos.1, pos.2, block) {
            Ok(())
        } else {
            Err(LevelError::malformed(
                "schematic",
                format!("{:?} lies outside the schematic grid", pos),
            ))
        }
    }

    fn block_entity(
        &mut self,
        dimension: &Dimension,
        pos: BlockPos,
    ) -> Result<Option<BlockEntity>, LevelError> {
        self.check(dimension)?;
        Ok(self.schematic.block_entities.get(&pos).cloned())
    }

    fn set_block_entity(
        &mut self,
        dimension: &Dimension,
        block_entity: BlockEntity,
    ) -> Result<(), LevelError> {
        self.check(dimension)?;
        self.schematic.add_block_entity(block_entity);
        Ok(())
    }

    fn remove_block_entity(
        &mut self,
        dimension: &Dimension,
        pos: BlockPos,
    ) -> Result<(), LevelError> {
        self.check(dimension)?;
        self.schematic.block_entities.remove(&pos);
        Ok(())
    }

    fn entities_in(
        &mut self,
        dimension: &Dimension,
        selection: &SelectionBox,
    ) -> Result<Vec<Entity>, LevelError> {
        self.check(dimension)?;
        Ok(self
            .schematic
            .entities
            .iter()
            .filter(|e| selection.contains_point(e.position))
            .cloned()
            .collect())
    }

    fn add_entity(&mut self, dimension: &Dimension, entity: Entity) -> Result<(), LevelError> {
        self.check(dimension)?;
        self.schematic.add_entity(entity);
        Ok(())
    }

    fn save(&mut self) -> Result<(), LevelError> {
        Err(LevelError::Unsupported("saving a schematic"))
    }

    fn close(&mut self) -> Result<(), LevelError> {
        self.closed = true;
        Ok(())
    }
}
