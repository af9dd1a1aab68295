//! One paste run: decompose every filename, open the world, paste each
//! schematic at its anchor, save once.

use crate::config::PasteConfig;
use crate::error::{LevelRole, PasteError};
use crate::level::{Dimension, Level, LevelLoader};
use crate::paste::{paste, PasteSummary};
use crate::placement::SchematicDescriptor;
use crate::selection::BlockPos;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PastedSchematic {
    pub path: PathBuf,
    pub descriptor: SchematicDescriptor,
    pub anchor: BlockPos,
    pub summary: PasteSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pasted: Vec<PastedSchematic>,
}

/// An open level that is closed on every exit path.
///
/// [`LevelGuard::close`] is the normal path and reports failures; dropping an
/// unclosed guard closes the level and only logs them.
struct LevelGuard {
    role: LevelRole,
    level: Box<dyn Level>,
    closed: bool,
}

impl LevelGuard {
    fn open(loader: &dyn LevelLoader, role: LevelRole, path: &Path) -> Result<Self, PasteError> {
        info!("Opening {} {}", role, path.display());
        let level = loader
            .load_level(path)
            .map_err(|source| PasteError::LoadLevel {
                role,
                path: path.to_path_buf(),
                source,
            })?;
        Ok(LevelGuard {
            role,
            level,
            closed: false,
        })
    }

    fn primary_dimension(&self) -> Result<Dimension, PasteError> {
        self.level
            .primary_dimension()
            .cloned()
            .ok_or_else(|| PasteError::NoDimensions {
                role: self.role,
                path: self.level.path().to_path_buf(),
            })
    }

    fn close(mut self) -> Result<(), PasteError> {
        self.closed = true;
        debug!("Closing {} {}", self.role, self.level.path().display());
        self.level.close().map_err(|source| PasteError::Close {
            role: self.role,
            path: self.level.path().to_path_buf(),
            source,
        })
    }
}

impl Drop for LevelGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.level.close() {
            warn!(
                "Failed to close {} {} after an error: {}",
                self.role,
                self.level.path().display(),
                e
            );
        }
    }
}

/// Decompose and offset one filename.
fn plan(path: &Path, min_x: i32, min_y: i32) -> Result<(SchematicDescriptor, BlockPos), PasteError> {
    let descriptor =
        SchematicDescriptor::from_path(path).map_err(|reason| PasteError::InvalidFilename {
            path: path.to_path_buf(),
            reason,
        })?;
    let shifted = descriptor
        .offset(min_x, min_y)
        .ok_or_else(|| PasteError::CoordinateOverflow {
            path: path.to_path_buf(),
            what: "world offset",
        })?;
    let anchor = shifted.anchor().ok_or_else(|| PasteError::CoordinateOverflow {
        path: path.to_path_buf(),
        what: "paste anchor",
    })?;
    Ok((descriptor, anchor))
}

fn paste_one(
    loader: &dyn LevelLoader,
    world: &mut LevelGuard,
    world_dimension: &Dimension,
    path: &Path,
    descriptor: SchematicDescriptor,
    anchor: BlockPos,
    config: &PasteConfig,
) -> Result<PastedSchematic, PasteError> {
    let mut schematic = LevelGuard::open(loader, LevelRole::Schematic, path)?;
    let dimension = schematic.primary_dimension()?;

    let bounds = schematic
        .level
        .bounds(&dimension)
        .map_err(|source| PasteError::Bounds {
            path: path.to_path_buf(),
            dimension: dimension.to_string(),
            source,
        })?;
    let selection = *bounds.first().ok_or_else(|| PasteError::EmptySelection {
        path: path.to_path_buf(),
        dimension: dimension.to_string(),
    })?;

    info!(
        "Pasting {} ({:?}) at {:?} in {}",
        path.display(),
        selection,
        anchor,
        world_dimension
    );
    let summary = paste(
        schematic.level.as_mut(),
        &dimension,
        &selection,
        world.level.as_mut(),
        world_dimension,
        anchor,
        &config.options,
    )
    .map_err(|source| PasteError::Paste {
        path: path.to_path_buf(),
        source,
    })?;

    schematic.close()?;
    Ok(PastedSchematic {
        path: path.to_path_buf(),
        descriptor,
        anchor,
        summary,
    })
}

/// Run `config` against levels opened through `loader`.
///
/// Every filename is decomposed before any level is opened. The world is
/// saved once, after the last paste, and never when a paste failed.
pub fn run(config: &PasteConfig, loader: &dyn LevelLoader) -> Result<RunSummary, PasteError> {
    if config.schematics.is_empty() {
        return Err(PasteError::NoSchematics);
    }
    let plans = config
        .schematics
        .iter()
        .map(|path| {
            plan(path, config.min_x, config.min_y).map(|(d, anchor)| (path.as_path(), d, anchor))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut world = LevelGuard::open(loader, LevelRole::World, &config.world_path)?;
    let world_dimension = world.primary_dimension()?;

    let mut summary = RunSummary::default();
    for (path, descriptor, anchor) in plans {
        let pasted = paste_one(
            loader,
            &mut world,
            &world_dimension,
            path,
            descriptor,
            anchor,
            config,
        )?;
        summary.pasted.push(pasted);
    }

    info!("Saving world {}", config.world_path.display());
    world.level.save().map_err(|source| PasteError::Save {
        path: config.world_path.clone(),
        source,
    })?;
    world.close()?;

    info!(
        "Pasted {} schematic(s) into {}",
        summary.pasted.len(),
        config.world_path.display()
    );
    Ok(summary)
}
