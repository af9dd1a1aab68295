use crate::error::PasteError;
use crate::paste::PasteOptions;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "schempaste")]
#[command(about = "Paste coordinate-named schematics into a Minecraft world")]
pub struct Cli {
    /// Schematic file named x_y_z_width_length_height.<ext>, or a comma-separated list of them
    #[arg(value_name = "SCHEMATIC_FILE_PATH")]
    pub schematics: String,

    /// Target world directory
    #[arg(value_name = "WORLD_PATH")]
    pub world: PathBuf,

    /// Subtracted from the x encoded in each filename
    #[arg(value_name = "MIN_X", allow_negative_numbers = true)]
    pub min_x: i32,

    /// Subtracted from the y encoded in each filename
    #[arg(value_name = "MIN_Y", allow_negative_numbers = true)]
    pub min_y: i32,
}

impl Cli {
    pub fn into_config(self) -> Result<PasteConfig, PasteError> {
        let schematics: Vec<PathBuf> = self
            .schematics
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect();
        if schematics.is_empty() {
            return Err(PasteError::NoSchematics);
        }

        Ok(PasteConfig {
            schematics,
            world_path: self.world,
            min_x: self.min_x,
            min_y: self.min_y,
            options: PasteOptions::default(),
        })
    }
}

/// Everything one run needs, fixed before any level is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteConfig {
    pub schematics: Vec<PathBuf>,
    pub world_path: PathBuf,
    pub min_x: i32,
    pub min_y: i32,
    pub options: PasteOptions,
}

impl PasteConfig {
    pub fn new(
        schematic: impl Into<PathBuf>,
        world_path: impl Into<PathBuf>,
        min_x: i32,
        min_y: i32,
    ) -> Self {
        PasteConfig {
            schematics: vec![schematic.into()],
            world_path: world_path.into(),
            min_x,
            min_y,
            options: PasteOptions::default(),
        }
    }
}
