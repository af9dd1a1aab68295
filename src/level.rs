//! The world-editing capability a paste is expressed against.
//!
//! A [`Level`] is anything blocks can be read from and written to: an Anvil
//! world directory ([`AnvilWorld`]) or a schematic loaded into memory
//! ([`SchematicLevel`]). [`load_level`] picks the right one for a path.

use crate::block_entity::BlockEntity;
use crate::entity::Entity;
use crate::error::LevelError;
use crate::formats::manager::get_manager;
use crate::formats::world::AnvilWorld;
use crate::schematic::SchematicLevel;
use crate::selection::{BlockPos, SelectionBox, SelectionGroup};
use crate::BlockState;
use smol_str::SmolStr;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Identifier of a dimension inside a level (`minecraft:overworld`, `main`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dimension(SmolStr);

impl Dimension {
    pub const OVERWORLD: &'static str = "minecraft:overworld";
    pub const NETHER: &'static str = "minecraft:the_nether";
    pub const END: &'static str = "minecraft:the_end";
    /// The single dimension of a schematic.
    pub const STRUCTURE: &'static str = "main";

    pub fn new(name: impl Into<SmolStr>) -> Self {
        Dimension(name.into())
    }

    pub fn overworld() -> Self {
        Dimension::new(Self::OVERWORLD)
    }

    pub fn nether() -> Self {
        Dimension::new(Self::NETHER)
    }

    pub fn end() -> Self {
        Dimension::new(Self::END)
    }

    pub fn structure() -> Self {
        Dimension::new(Self::STRUCTURE)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An open world or schematic.
///
/// Reads take `&mut self` because backends load chunk data lazily.
pub trait Level {
    /// Path the level was opened from.
    fn path(&self) -> &Path;

    /// Dimensions in their canonical order; the first one is the primary dimension.
    fn dimensions(&self) -> &[Dimension];

    fn primary_dimension(&self) -> Option<&Dimension> {
        self.dimensions().first()
    }

    fn has_dimension(&self, dimension: &Dimension) -> bool {
        self.dimensions().contains(dimension)
    }

    /// Extent of the data stored in `dimension`.
    fn bounds(&self, dimension: &Dimension) -> Result<SelectionGroup, LevelError>;

    /// Lowest and one-past-highest y a block may be written at, when the level has limits.
    fn height_range(&self, dimension: &Dimension) -> Option<(i32, i32)> {
        let _ = dimension;
        None
    }

    /// `None` when nothing is stored at `pos`.
    fn block(&mut self, dimension: &Dimension, pos: BlockPos)
        -> Result<Option<BlockState>, LevelError>;

    fn set_block(
        &mut self,
        dimension: &Dimension,
        pos: BlockPos,
        block: &BlockState,
    ) -> Result<(), LevelError>;

    fn block_entity(
        &mut self,
        dimension: &Dimension,
        pos: BlockPos,
    ) -> Result<Option<BlockEntity>, LevelError>;

    /// Store a block entity at its own `position`, replacing any previous one.
    fn set_block_entity(
        &mut self,
        dimension: &Dimension,
        block_entity: BlockEntity,
    ) -> Result<(), LevelError>;

    fn remove_block_entity(&mut self, dimension: &Dimension, pos: BlockPos)
        -> Result<(), LevelError>;

    fn entities_in(
        &mut self,
        dimension: &Dimension,
        selection: &SelectionBox,
    ) -> Result<Vec<Entity>, LevelError>;

    fn add_entity(&mut self, dimension: &Dimension, entity: Entity) -> Result<(), LevelError>;

    /// Persist every change made since the level was opened.
    fn save(&mut self) -> Result<(), LevelError>;

    /// Release the level. Any later call fails with [`LevelError::Closed`].
    fn close(&mut self) -> Result<(), LevelError>;
}

/// Opens levels by path. The runner only talks to this seam.
pub trait LevelLoader {
    fn load_level(&self, path: &Path) -> Result<Box<dyn Level>, LevelError>;
}

/// Loader backed by [`load_level`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLoader;

impl LevelLoader for DefaultLoader {
    fn load_level(&self, path: &Path) -> Result<Box<dyn Level>, LevelError> {
        load_level(path)
    }
}

/// Open a world directory as an [`AnvilWorld`], or read a schematic file through
/// the format manager.
pub fn load_level(path: &Path) -> Result<Box<dyn Level>, LevelError> {
    if path.is_dir() {
        debug!("Opening {} as an Anvil world", path.display());
        return Ok(Box::new(AnvilWorld::open(path)?));
    }

    let data = std::fs::read(path)?;
    let manager = get_manager();
    let format = manager.detect_format(&data).ok_or_else(|| {
        LevelError::UnsupportedFormat(format!(
            "{} is neither a world directory nor a schematic in a known format ({})",
            path.display(),
            manager.list_importers().join(", ")
        ))
    })?;
    debug!("Reading {} as {}", path.display(), format);
    let schematic = manager.read(&data)?;
    Ok(Box::new(SchematicLevel::new(path, schematic)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_names() {
        assert_eq!(Dimension::overworld().as_str(), "minecraft:overworld");
        assert_eq!(Dimension::structure().to_string(), "main");
        assert_ne!(Dimension::nether(), Dimension::end());
    }

    #[test]
    fn test_load_level_missing_path() {
        let result = load_level(Path::new("/nonexistent/schempaste/10_5_20_4_6_3.schematic"));
        assert!(matches!(result, Err(LevelError::Io(_))));
    }

    #[test]
    fn test_load_level_rejects_unknown_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0_0_0_1_1_1.schematic");
        std::fs::write(&path, b"definitely not nbt").unwrap();
        match load_level(&path) {
            Err(LevelError::UnsupportedFormat(message)) => {
                assert!(message.ends_with("(Sponge, MCEdit)"), "{}", message)
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("garbage bytes opened as a level"),
        }
    }
}
