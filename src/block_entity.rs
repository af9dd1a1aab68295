use crate::error::LevelError;
use crate::selection::BlockPos;
use quartz_nbt::{NbtCompound, NbtTag};

/// Block entity (chest contents, sign text, ...) with an absolute position.
/// `nbt` holds every tag except `id` and the position.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEntity {
    pub id: String,
    pub position: BlockPos,
    pub nbt: NbtCompound,
}

impl BlockEntity {
    pub fn new(id: impl Into<String>, position: BlockPos) -> Self {
        BlockEntity {
            id: id.into(),
            position,
            nbt: NbtCompound::new(),
        }
    }

    pub fn translated(&self, offset: (i32, i32, i32)) -> Self {
        let mut moved = self.clone();
        moved.position = (
            self.position.0 + offset.0,
            self.position.1 + offset.1,
            self.position.2 + offset.2,
        );
        moved
    }

    /// Chunk-format compound: `id`, `x`, `y`, `z` plus the remaining tags.
    pub fn to_nbt(&self) -> NbtCompound {
        let mut compound = self.nbt.clone();
        compound.insert("id", NbtTag::String(self.id.clone()));
        compound.insert("x", NbtTag::Int(self.position.0));
        compound.insert("y", NbtTag::Int(self.position.1));
        compound.insert("z", NbtTag::Int(self.position.2));
        compound
    }

    /// Parse the chunk-format compound written by [`BlockEntity::to_nbt`].
    pub fn from_nbt(nbt: &NbtCompound) -> Result<Self, LevelError> {
        let coord = |key: &str| {
            nbt.get::<_, i32>(key).map_err(|e| {
                LevelError::malformed("block entity", format!("missing {}: {}", key, e))
            })
        };
        let position = (coord("x")?, coord("y")?, coord("z")?);
        let id = nbt
            .get::<_, &str>("id")
            .map(|s| s.to_string())
            .unwrap_or_default();

        let mut block_entity = BlockEntity::new(id, position);
        for (key, value) in nbt.inner() {
            match key.as_str() {
                "x" | "y" | "z" | "id" => continue,
                _ => {
                    block_entity.nbt.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(block_entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nbt_roundtrip() {
        let mut chest = BlockEntity::new("minecraft:chest", (10, 64, -3));
        chest
            .nbt
            .insert("CustomName", NbtTag::String("\"Loot\"".to_string()));

        let nbt = chest.to_nbt();
        assert_eq!(nbt.get::<_, i32>("x").unwrap(), 10);
        assert_eq!(nbt.get::<_, &str>("id").unwrap(), "minecraft:chest");

        let parsed = BlockEntity::from_nbt(&nbt).unwrap();
        assert_eq!(parsed, chest);
    }

    #[test]
    fn test_translated() {
        let sign = BlockEntity::new("minecraft:sign", (1, 2, 3));
        assert_eq!(sign.translated((10, -2, 5)).position, (11, 0, 8));
    }

    #[test]
    fn test_missing_position_is_an_error() {
        let mut nbt = NbtCompound::new();
        nbt.insert("id", NbtTag::String("minecraft:chest".to_string()));
        assert!(BlockEntity::from_nbt(&nbt).is_err());
    }
}
