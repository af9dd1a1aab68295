//! Where a schematic goes, derived from its filename.
//!
//! Tiles are named `x_y_z_width_length_height.<ext>`. The target world's
//! y axis is vertical, while the tile's first two coordinates are horizontal,
//! so the anchor swaps axes: world `(X, Y, Z) = (y + length / 2,
//! z + height / 2 + 1, x + width / 2)`.

use crate::error::FilenameError;
use crate::selection::BlockPos;
use std::path::Path;
use std::str::FromStr;

const FIELDS: [&str; 6] = ["x", "y", "z", "width", "length", "height"];

/// The six integers encoded in a schematic's filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchematicDescriptor {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub width: i32,
    pub length: i32,
    pub height: i32,
}

impl SchematicDescriptor {
    /// Decompose the file name of `path`; directories and extensions are ignored.
    pub fn from_path(path: &Path) -> Result<Self, FilenameError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(FilenameError::NoFileName)?;
        Self::from_base_name(name)
    }

    /// Parse a file name; everything from the first `.` on is dropped.
    pub fn from_base_name(name: &str) -> Result<Self, FilenameError> {
        let base = name.split('.').next().unwrap_or(name);
        let tokens: Vec<&str> = base.split('_').collect();
        if tokens.len() != FIELDS.len() {
            return Err(FilenameError::TokenCount(tokens.len()));
        }

        let mut values = [0i32; 6];
        for (i, token) in tokens.iter().enumerate() {
            values[i] = token.parse().map_err(|_| FilenameError::NotAnInteger {
                field: FIELDS[i],
                token: token.to_string(),
            })?;
        }

        Ok(SchematicDescriptor {
            x: values[0],
            y: values[1],
            z: values[2],
            width: values[3],
            length: values[4],
            height: values[5],
        })
    }

    /// Shift into world space: `x -= min_x`, `y -= min_y`. `z` is left as is.
    pub fn offset(&self, min_x: i32, min_y: i32) -> Option<Self> {
        Some(SchematicDescriptor {
            x: self.x.checked_sub(min_x)?,
            y: self.y.checked_sub(min_y)?,
            ..*self
        })
    }

    /// Point the schematic is centred on, after [`offset`](Self::offset).
    pub fn anchor(&self) -> Option<BlockPos> {
        let horizontal_a = self.y.checked_add(self.length.div_euclid(2))?;
        let vertical = self
            .z
            .checked_add(self.height.div_euclid(2))?
            .checked_add(1)?;
        let horizontal_b = self.x.checked_add(self.width.div_euclid(2))?;
        Some((horizontal_a, vertical, horizontal_b))
    }
}

impl FromStr for SchematicDescriptor {
    type Err = FilenameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base_name(s)
    }
}
