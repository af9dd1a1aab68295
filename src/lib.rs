//! Paste coordinate-named schematics into Anvil worlds.
//!
//! A schematic named `x_y_z_width_length_height.<ext>` is opened as a
//! [`Level`](level::Level), its first selection box is centred on the anchor
//! computed by [`placement`], and [`paste`](paste::paste) copies it into the
//! primary dimension of the target world.

pub mod block_entity;
pub mod block_state;
pub mod config;
pub mod entity;
pub mod error;
pub mod formats;
pub mod level;
pub mod logger;
pub mod paste;
pub mod placement;
pub mod runner;
pub mod schematic;
pub mod selection;

pub use block_entity::BlockEntity;
pub use block_state::BlockState;
pub use config::{Cli, PasteConfig};
pub use entity::Entity;
pub use error::{LevelError, PasteError};
pub use formats::world::AnvilWorld;
pub use level::{load_level, DefaultLoader, Dimension, Level, LevelLoader};
pub use paste::{paste, PasteOptions, PasteSummary};
pub use placement::SchematicDescriptor;
pub use runner::{run, RunSummary};
pub use schematic::{Schematic, SchematicLevel};
pub use selection::{BlockPos, SelectionBox, SelectionGroup};
