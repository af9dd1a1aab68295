use crate::error::LevelError;
use quartz_nbt::{NbtCompound, NbtTag};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use std::hash::{Hash, Hasher};

pub const AIR: &str = "minecraft:air";
pub const STRUCTURE_VOID: &str = "minecraft:structure_void";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockState {
    pub name: SmolStr,
    pub properties: Vec<(SmolStr, SmolStr)>,
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.properties.is_empty() {
            write!(f, "[")?;
            for (i, (key, value)) in self.properties.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}={}", key, value)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl Hash for BlockState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        for (k, v) in &self.properties {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl BlockState {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        BlockState {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    pub fn air() -> Self {
        BlockState::new(AIR)
    }

    /// Parse the `namespace:name[key=value,...]` notation used by Sponge palettes.
    /// A missing namespace defaults to `minecraft:`.
    pub fn parse(text: &str) -> Result<Self, LevelError> {
        let text = text.trim();
        let (name, props) = match text.find('[') {
            Some(open) => {
                let close = text.rfind(']').filter(|&close| close > open).ok_or_else(|| {
                    LevelError::malformed("block state", format!("unclosed '[' in {:?}", text))
                })?;
                (&text[..open], Some(&text[open + 1..close]))
            }
            None => (text, None),
        };
        if name.is_empty() {
            return Err(LevelError::malformed(
                "block state",
                format!("empty block name in {:?}", text),
            ));
        }

        let mut block = if name.contains(':') {
            BlockState::new(name)
        } else {
            BlockState::new(format!("minecraft:{}", name))
        };
        if let Some(props) = props {
            for pair in props.split(',').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').ok_or_else(|| {
                    LevelError::malformed(
                        "block state",
                        format!("property {:?} in {:?} has no value", pair, text),
                    )
                })?;
                block.set_property(key.trim(), value.trim());
            }
        }
        Ok(block)
    }

    pub fn get_name(&self) -> &str {
        self.name.as_str()
    }

    pub fn is_air(&self) -> bool {
        matches!(
            self.name.as_str(),
            "minecraft:air" | "minecraft:cave_air" | "minecraft:void_air"
        )
    }

    pub fn is_structure_void(&self) -> bool {
        self.name == STRUCTURE_VOID
    }

    pub fn with_property(mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) {
        let key = key.into();
        let value = value.into();
        for (k, v) in &mut self.properties {
            if *k == key {
                *v = value;
                return;
            }
        }
        self.properties.push((key, value));
    }

    pub fn get_property(&self, key: &str) -> Option<&SmolStr> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn to_nbt(&self) -> NbtTag {
        let mut compound = NbtCompound::new();
        compound.insert("Name", self.name.to_string());

        if !self.properties.is_empty() {
            let mut properties = NbtCompound::new();
            for (key, value) in &self.properties {
                properties.insert(key.to_string(), value.to_string());
            }
            compound.insert("Properties", properties);
        }

        NbtTag::Compound(compound)
    }

    pub fn from_nbt(compound: &NbtCompound) -> Result<Self, LevelError> {
        let name: SmolStr = compound
            .get::<_, &String>("Name")
            .map_err(|e| LevelError::malformed("block state", format!("missing Name: {}", e)))?
            .into();

        let mut properties = Vec::new();
        if let Ok(props) = compound.get::<_, &NbtCompound>("Properties") {
            for (key, value) in props.inner() {
                if let NbtTag::String(value_str) = value {
                    properties.push((key.into(), value_str.into()));
                }
            }
        }

        Ok(BlockState { name, properties })
    }
}
