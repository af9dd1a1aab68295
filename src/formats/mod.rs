pub mod anvil;
pub mod legacy;
pub mod manager;
pub mod mcedit;
pub mod sponge;
pub mod world;

use crate::error::{LevelError, NbtContext};
use quartz_nbt::io::Flavor;
use quartz_nbt::{NbtCompound, NbtList, NbtTag};
use std::io::Cursor;

pub(crate) fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

/// Read a root compound that may or may not be gzip-compressed.
pub(crate) fn read_nbt_auto(data: &[u8], context: &str) -> Result<NbtCompound, LevelError> {
    let flavor = if is_gzip(data) {
        Flavor::GzCompressed
    } else {
        Flavor::Uncompressed
    };
    let (root, _) = quartz_nbt::io::read_nbt(&mut Cursor::new(data), flavor).nbt_context(context)?;
    Ok(root)
}

pub(crate) fn tag<'a>(compound: &'a NbtCompound, key: &str) -> Option<&'a NbtTag> {
    compound.inner().get(key)
}

/// Read a numeric tag of any integer width as `i32`.
pub(crate) fn int(compound: &NbtCompound, key: &str, format: &'static str) -> Result<i32, LevelError> {
    match tag(compound, key) {
        Some(NbtTag::Byte(v)) => Ok(*v as i32),
        Some(NbtTag::Short(v)) => Ok(*v as i32),
        Some(NbtTag::Int(v)) => Ok(*v),
        Some(other) => Err(LevelError::malformed(
            format,
            format!("{} has unexpected tag type {:?}", key, other),
        )),
        None => Err(LevelError::malformed(format, format!("missing {}", key))),
    }
}

/// Read a schematic extent stored as an unsigned short.
pub(crate) fn extent(compound: &NbtCompound, key: &str, format: &'static str) -> Result<i32, LevelError> {
    match tag(compound, key) {
        Some(NbtTag::Short(v)) => Ok(*v as u16 as i32),
        _ => int(compound, key, format),
    }
}

pub(crate) fn byte_array<'a>(
    compound: &'a NbtCompound,
    key: &str,
    format: &'static str,
) -> Result<&'a [i8], LevelError> {
    match tag(compound, key) {
        Some(NbtTag::ByteArray(bytes)) => Ok(bytes),
        Some(_) => Err(LevelError::malformed(format, format!("{} is not a byte array", key))),
        None => Err(LevelError::malformed(format, format!("missing {}", key))),
    }
}

pub(crate) fn compound_list<'a>(
    compound: &'a NbtCompound,
    key: &str,
) -> impl Iterator<Item = &'a NbtCompound> + 'a {
    let list: Option<&'a NbtList> = match tag(compound, key) {
        Some(NbtTag::List(list)) => Some(list),
        _ => None,
    };
    list.into_iter().flat_map(|list| {
        list.iter().filter_map(|t| match t {
            NbtTag::Compound(c) => Some(c),
            _ => None,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn sample() -> NbtCompound {
        let mut root = NbtCompound::new();
        root.insert("Width", NbtTag::Short(-1));
        root.insert("Count", NbtTag::Byte(7));
        root.insert("Blocks", NbtTag::ByteArray(vec![1, 2, 3]));
        root
    }

    #[test]
    fn test_read_nbt_auto_handles_both_flavors() {
        let root = sample();

        let mut raw = Vec::new();
        quartz_nbt::io::write_nbt(&mut raw, Some("Schematic"), &root, Flavor::Uncompressed).unwrap();
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        quartz_nbt::io::write_nbt(&mut gz, Some("Schematic"), &root, Flavor::Uncompressed).unwrap();
        let gz = gz.finish().unwrap();

        assert!(!is_gzip(&raw));
        assert!(is_gzip(&gz));
        assert_eq!(read_nbt_auto(&raw, "test").unwrap(), root);
        assert_eq!(read_nbt_auto(&gz, "test").unwrap(), root);
    }

    #[test]
    fn test_typed_accessors() {
        let root = sample();
        assert_eq!(extent(&root, "Width", "test").unwrap(), 65535);
        assert_eq!(int(&root, "Count", "test").unwrap(), 7);
        assert_eq!(byte_array(&root, "Blocks", "test").unwrap(), &[1, 2, 3]);
        assert!(int(&root, "Missing", "test").is_err());
        assert!(byte_array(&root, "Width", "test").is_err());
        assert_eq!(compound_list(&root, "Missing").count(), 0);
    }
}
