//! Copying a box of one level into another.

use crate::error::LevelError;
use crate::level::{Dimension, Level};
use crate::selection::{BlockPos, SelectionBox};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What a paste copies besides the box itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasteOptions {
    pub include_blocks: bool,
    pub include_entities: bool,
}

impl Default for PasteOptions {
    fn default() -> Self {
        PasteOptions {
            include_blocks: true,
            include_entities: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasteSummary {
    pub destination: SelectionBox,
    pub blocks_written: u64,
    /// Structure voids and positions the source stores nothing for.
    pub blocks_skipped: u64,
    pub block_entities: usize,
    pub entities: usize,
}

/// Box of the same size as `selection` whose centre sits on `location`.
///
/// Per axis the minimum corner is `location - size.div_euclid(2)`, so an even
/// extent puts `location` on the block just past the middle.
pub fn destination_box(selection: &SelectionBox, location: BlockPos) -> Result<SelectionBox, LevelError> {
    let (sx, sy, sz) = selection.size();
    let overflow = || LevelError::CoordinateOverflow("paste destination");
    let min = (
        location.0.checked_sub(sx.div_euclid(2)).ok_or_else(overflow)?,
        location.1.checked_sub(sy.div_euclid(2)).ok_or_else(overflow)?,
        location.2.checked_sub(sz.div_euclid(2)).ok_or_else(overflow)?,
    );
    let max = (
        min.0.checked_add(sx).ok_or_else(overflow)?,
        min.1.checked_add(sy).ok_or_else(overflow)?,
        min.2.checked_add(sz).ok_or_else(overflow)?,
    );
    Ok(SelectionBox { min, max })
}

fn require_dimension(level: &dyn Level, dimension: &Dimension) -> Result<(), LevelError> {
    if level.has_dimension(dimension) {
        Ok(())
    } else {
        Err(LevelError::UnknownDimension(dimension.to_string()))
    }
}

/// Copy `selection` of `source`'s `src_dim` into `destination`'s `dst_dim`,
/// centred on `location`.
///
/// Air is copied like any other block; a structure void leaves the destination
/// block alone. Block entities at overwritten positions are replaced by the
/// copied ones. Nothing is written when the destination box leaves the build
/// height of `dst_dim`.
pub fn paste(
    source: &mut dyn Level,
    src_dim: &Dimension,
    selection: &SelectionBox,
    destination: &mut dyn Level,
    dst_dim: &Dimension,
    location: BlockPos,
    options: &PasteOptions,
) -> Result<PasteSummary, LevelError> {
    require_dimension(source, src_dim)?;
    require_dimension(destination, dst_dim)?;

    let target = destination_box(selection, location)?;
    if let Some((min_y, max_y)) = destination.height_range(dst_dim) {
        if !target.is_empty() && (target.min.1 < min_y || target.max.1 > max_y) {
            return Err(LevelError::OutOfBuildHeight {
                low: target.min.1,
                high: target.max.1,
                min_y,
                max_y,
            });
        }
    }

    let offset = (
        target.min.0 - selection.min.0,
        target.min.1 - selection.min.1,
        target.min.2 - selection.min.2,
    );
    debug!(
        "Pasting {:?} of {} into {:?} of {} (offset {:?})",
        selection, src_dim, target, dst_dim, offset
    );

    let mut summary = PasteSummary {
        destination: target,
        blocks_written: 0,
        blocks_skipped: 0,
        block_entities: 0,
        entities: 0,
    };

    if options.include_blocks {
        for pos in selection.blocks() {
            let block = match source.block(src_dim, pos)? {
                Some(block) if !block.is_structure_void() => block,
                _ => {
                    summary.blocks_skipped += 1;
                    continue;
                }
            };
            let dst = (pos.0 + offset.0, pos.1 + offset.1, pos.2 + offset.2);
            destination.remove_block_entity(dst_dim, dst)?;
            destination.set_block(dst_dim, dst, &block)?;
            summary.blocks_written += 1;

            if let Some(block_entity) = source.block_entity(src_dim, pos)? {
                destination.set_block_entity(dst_dim, block_entity.translated(offset))?;
                summary.block_entities += 1;
            }
        }
    }

    if options.include_entities {
        for entity in source.entities_in(src_dim, selection)? {
            destination.add_entity(dst_dim, entity.translated(offset).with_fresh_uuid())?;
            summary.entities += 1;
        }
    }

    info!(
        "Pasted {} blocks ({} skipped), {} block entities, {} entities into {:?}",
        summary.blocks_written,
        summary.blocks_skipped,
        summary.block_entities,
        summary.entities,
        target
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_entity::BlockEntity;
    use crate::entity::Entity;
    use crate::schematic::{Schematic, SchematicLevel};
    use crate::BlockState;

    fn structure() -> Dimension {
        Dimension::structure()
    }

    fn source_level() -> SchematicLevel {
        // 4 x 6 x 3, stone floor, structure void at (1, 1, 1), chest at (0, 1, 0)
        let mut schematic = Schematic::new("source", (4, 6, 3));
        let stone = BlockState::new("minecraft:stone");
        for x in 0..4 {
            for z in 0..3 {
                schematic.set_block(x, 0, z, &stone);
            }
        }
        schematic.set_block(1, 1, 1, &BlockState::new("minecraft:structure_void"));
        schematic.set_block(0, 1, 0, &BlockState::new("minecraft:chest"));
        schematic.add_block_entity(BlockEntity::new("minecraft:chest", (0, 1, 0)));
        schematic.add_entity(Entity::new("minecraft:sheep", (2.5, 1.0, 1.5)));
        SchematicLevel::new("source.schematic", schematic)
    }

    fn destination_level() -> SchematicLevel {
        let mut schematic = Schematic::new("destination", (20, 20, 20));
        let dirt = BlockState::new("minecraft:dirt");
        for pos in SelectionBox::new((0, 0, 0), (20, 20, 20)).blocks() {
            schematic.set_block(pos.0, pos.1, pos.2, &dirt);
        }
        schematic.add_block_entity(BlockEntity::new("minecraft:furnace", (9, 8, 10)));
        SchematicLevel::new("destination.schematic", schematic)
    }

    #[test]
    fn test_destination_box_centres_on_location() {
        let selection = SelectionBox::new((0, 0, 0), (4, 6, 3));
        let target = destination_box(&selection, (10, 10, 10)).unwrap();
        assert_eq!(target, SelectionBox::new((8, 7, 9), (12, 13, 12)));

        let odd = SelectionBox::new((5, 5, 5), (6, 6, 6));
        assert_eq!(
            destination_box(&odd, (-3, 0, 7)).unwrap(),
            SelectionBox::new((-3, 0, 7), (-2, 1, 8))
        );
    }

    #[test]
    fn test_destination_box_overflow() {
        let selection = SelectionBox::new((0, 0, 0), (4, 4, 4));
        assert!(matches!(
            destination_box(&selection, (i32::MAX, 0, 0)),
            Err(LevelError::CoordinateOverflow(_))
        ));
    }

    #[test]
    fn test_paste_copies_blocks_and_air() {
        let mut source = source_level();
        let mut destination = destination_level();
        let selection = source.schematic().selection();

        let summary = paste(
            &mut source,
            &structure(),
            &selection,
            &mut destination,
            &structure(),
            (10, 10, 10),
            &PasteOptions::default(),
        )
        .unwrap();

        assert_eq!(summary.destination, SelectionBox::new((8, 7, 9), (12, 13, 12)));
        assert_eq!(summary.blocks_written, 4 * 6 * 3 - 1);
        assert_eq!(summary.blocks_skipped, 1);
        assert_eq!(summary.entities, 0);

        let result = destination.schematic();
        assert_eq!(result.get_block(8, 7, 9), Some(&BlockState::new("minecraft:stone")));
        // Air overwrites the destination.
        assert_eq!(result.get_block(11, 12, 11), Some(&BlockState::air()));
        // Structure void leaves it alone.
        assert_eq!(result.get_block(9, 8, 10), Some(&BlockState::new("minecraft:dirt")));
        // Outside the box nothing changes.
        assert_eq!(result.get_block(12, 7, 9), Some(&BlockState::new("minecraft:dirt")));
    }

    #[test]
    fn test_paste_moves_block_entities() {
        let mut source = source_level();
        let mut destination = destination_level();
        let selection = source.schematic().selection();

        let summary = paste(
            &mut source,
            &structure(),
            &selection,
            &mut destination,
            &structure(),
            (10, 10, 10),
            &PasteOptions::default(),
        )
        .unwrap();
        assert_eq!(summary.block_entities, 1);

        let result = destination.schematic();
        assert_eq!(result.block_entities[&(8, 8, 9)].id, "minecraft:chest");
        // The furnace sits under the structure void and survives.
        assert_eq!(result.block_entities[&(9, 8, 10)].id, "minecraft:furnace");
    }

    #[test]
    fn test_paste_overwrites_block_entities() {
        let mut source = source_level();
        let mut destination = destination_level();
        destination
            .set_block_entity(&structure(), BlockEntity::new("minecraft:barrel", (10, 7, 10)))
            .unwrap();
        let selection = source.schematic().selection();

        paste(
            &mut source,
            &structure(),
            &selection,
            &mut destination,
            &structure(),
            (10, 10, 10),
            &PasteOptions::default(),
        )
        .unwrap();
        assert!(!destination
            .schematic()
            .block_entities
            .contains_key(&(10, 7, 10)));
    }

    #[test]
    fn test_paste_entities_when_requested() {
        let mut source = source_level();
        let mut destination = destination_level();
        let selection = source.schematic().selection();
        let options = PasteOptions {
            include_blocks: false,
            include_entities: true,
        };

        let summary = paste(
            &mut source,
            &structure(),
            &selection,
            &mut destination,
            &structure(),
            (10, 10, 10),
            &options,
        )
        .unwrap();

        assert_eq!(summary.blocks_written, 0);
        assert_eq!(summary.entities, 1);
        let sheep = &destination.schematic().entities[0];
        assert_eq!(sheep.position, (10.5, 8.0, 10.5));
        assert!(sheep.nbt.contains_key("UUID"));
        assert_eq!(
            destination.schematic().get_block(8, 7, 9),
            Some(&BlockState::new("minecraft:dirt"))
        );
    }

    #[test]
    fn test_paste_outside_build_height_writes_nothing() {
        let mut source = source_level();
        let mut destination = destination_level();
        let selection = source.schematic().selection();

        let result = paste(
            &mut source,
            &structure(),
            &selection,
            &mut destination,
            &structure(),
            (10, 18, 10),
            &PasteOptions::default(),
        );
        assert!(matches!(
            result,
            Err(LevelError::OutOfBuildHeight {
                low: 15,
                high: 21,
                min_y: 0,
                max_y: 20
            })
        ));
        assert_eq!(
            destination.schematic().get_block(8, 15, 9),
            Some(&BlockState::new("minecraft:dirt"))
        );
    }

    #[test]
    fn test_paste_rejects_unknown_dimensions() {
        let mut source = source_level();
        let mut destination = destination_level();
        let selection = source.schematic().selection();

        let result = paste(
            &mut source,
            &Dimension::overworld(),
            &selection,
            &mut destination,
            &structure(),
            (10, 10, 10),
            &PasteOptions::default(),
        );
        assert!(matches!(result, Err(LevelError::UnknownDimension(_))));
    }

    #[test]
    fn test_options_from_json() {
        let options: PasteOptions = serde_json::from_str(r#"{"include_entities": true}"#).unwrap();
        assert!(options.include_blocks);
        assert!(options.include_entities);

        let defaults: PasteOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, PasteOptions::default());
    }
}
