use crate::error::LevelError;
use quartz_nbt::{NbtCompound, NbtList, NbtTag};
use rand::Rng;

#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub id: String,
    pub position: (f64, f64, f64),
    /// Every tag of the entity except `id` and `Pos`.
    pub nbt: NbtCompound,
}

impl Entity {
    pub fn new(id: impl Into<String>, position: (f64, f64, f64)) -> Self {
        Entity {
            id: id.into(),
            position,
            nbt: NbtCompound::new(),
        }
    }

    pub fn translated(&self, offset: (i32, i32, i32)) -> Self {
        let mut moved = self.clone();
        moved.position = (
            self.position.0 + offset.0 as f64,
            self.position.1 + offset.1 as f64,
            self.position.2 + offset.2 as f64,
        );
        moved
    }

    /// Replace the entity's UUID so a pasted copy never collides with its original.
    pub fn with_fresh_uuid(mut self) -> Self {
        let mut rng = rand::thread_rng();
        let uuid: Vec<i32> = (0..4).map(|_| rng.gen()).collect();
        self.nbt.insert("UUID", NbtTag::IntArray(uuid));
        self
    }

    pub fn to_nbt(&self) -> NbtTag {
        let mut compound = self.nbt.clone();

        let full_id = if self.id.contains(':') {
            self.id.clone()
        } else {
            format!("minecraft:{}", self.id)
        };
        compound.insert("id", NbtTag::String(full_id));

        let pos_list = NbtList::from(vec![
            NbtTag::Double(self.position.0),
            NbtTag::Double(self.position.1),
            NbtTag::Double(self.position.2),
        ]);
        compound.insert("Pos", NbtTag::List(pos_list));

        NbtTag::Compound(compound)
    }

    /// Accepts both the chunk layout (`id`, `Pos`) and the Sponge v2 layout (`Id`, `Pos`).
    pub fn from_nbt(nbt: &NbtCompound) -> Result<Self, LevelError> {
        let id = match nbt.get::<_, &str>("id") {
            Ok(id) => id.to_string(),
            Err(_) => nbt
                .get::<_, &str>("Id")
                .map(|id| id.to_string())
                .map_err(|e| LevelError::malformed("entity", format!("missing id: {}", e)))?,
        };
        let id = if id.contains(':') {
            id
        } else {
            format!("minecraft:{}", id)
        };

        let pos = nbt
            .get::<_, &NbtList>("Pos")
            .map_err(|e| LevelError::malformed("entity", format!("missing Pos: {}", e)))?;
        if pos.len() != 3 {
            return Err(LevelError::malformed(
                "entity",
                format!("Pos has {} components, expected 3", pos.len()),
            ));
        }
        let component = |i: usize| {
            pos.get::<f64>(i)
                .map_err(|e| LevelError::malformed("entity", format!("bad Pos[{}]: {}", i, e)))
        };
        let position = (component(0)?, component(1)?, component(2)?);

        let mut rest = NbtCompound::new();
        for (key, value) in nbt.inner() {
            match key.as_str() {
                "id" | "Id" | "Pos" => continue,
                _ => {
                    rest.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(Entity {
            id,
            position,
            nbt: rest,
        })
    }
}
