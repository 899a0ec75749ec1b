//! Variable-length buffers trailing the asset table.
//!
//! A manifest carries four of them, in this order:
//!
//! 1. asset references: `(type id, instance id)` `u32` pairs, addressed by
//!    byte offset and pair count from each [`AssetEntry`](crate::layout::AssetEntry);
//! 2. external manifest names: `[tag][name][NUL]` records read back to back;
//! 3. asset names and 4. source file names: NUL-terminated strings,
//!    addressed by byte offset.
//!
//! Name bytes are Latin-1: every byte maps to the char of the same value, so
//! any name read from a manifest writes back byte for byte.
//!
//! Each buffer type has a builder used by writers and a reader function used
//! when decoding.

use crate::asset::AssetReference;
use crate::layout::ByteOrder;
use crate::ManifestError;

/// Tag byte of a plain external manifest name.
pub const EXTERNAL_MANIFEST_TAG: u8 = 0;
/// Tag byte of the patch manifest name.
pub const PATCH_MANIFEST_TAG: u8 = 2;

/// Size in bytes of one encoded reference pair.
pub const REFERENCE_SIZE: usize = 8;

fn corrupt(details: String) -> ManifestError {
    ManifestError::Corrupt { details }
}

/// Decode Latin-1 bytes.
pub fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encode `name` as Latin-1, rejecting chars above U+00FF and NUL.
pub fn string_to_latin1(name: &str) -> Result<Vec<u8>, ManifestError> {
    name.chars()
        .map(|c| match u8::try_from(c) {
            Ok(0) => Err(corrupt(format!("name {name:?} contains a NUL byte"))),
            Ok(b) => Ok(b),
            Err(_) => Err(corrupt(format!("name {name:?} has {c:?} outside Latin-1"))),
        })
        .collect()
}

fn offset_u32(len: usize, what: &str) -> Result<u32, ManifestError> {
    u32::try_from(len).map_err(|_| corrupt(format!("{what} exceeds 4 GiB")))
}

// ---------------------------------------------------------------------------
// Name buffers
// ---------------------------------------------------------------------------

/// Builder for the asset name and source file name buffers.
#[derive(Debug, Clone, Default)]
pub struct NameBuffer {
    bytes: Vec<u8>,
}

impl NameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `name` and return the offset it was stored at.
    ///
    /// Names are stored NUL-terminated; an interior NUL would split the name
    /// on read, so it is rejected.
    pub fn add_name(&mut self, name: &str) -> Result<u32, ManifestError> {
        let encoded = string_to_latin1(name)?;
        let offset = offset_u32(self.bytes.len(), "name buffer")?;
        self.bytes.extend_from_slice(&encoded);
        self.bytes.push(0);
        Ok(offset)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Read the NUL-terminated name starting at `offset`.
pub fn read_name(buffer: &[u8], offset: u32) -> Result<String, ManifestError> {
    let start = offset as usize;
    let tail = buffer.get(start..).ok_or_else(|| {
        corrupt(format!(
            "name offset {offset} outside buffer of {} bytes",
            buffer.len()
        ))
    })?;
    let len = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| corrupt(format!("name at offset {offset} is not NUL-terminated")))?;
    Ok(latin1_to_string(&tail[..len]))
}

// ---------------------------------------------------------------------------
// Reference buffer
// ---------------------------------------------------------------------------

/// Builder for the asset reference buffer.
#[derive(Debug, Clone, Default)]
pub struct ReferenceBuffer {
    bytes: Vec<u8>,
    order: ByteOrder,
}

impl ReferenceBuffer {
    pub fn new(order: ByteOrder) -> Self {
        Self {
            bytes: Vec::new(),
            order,
        }
    }

    /// Append `references` and return `(byte offset, count)` for the entry.
    pub fn add_references(
        &mut self,
        references: &[AssetReference],
    ) -> Result<(u32, u32), ManifestError> {
        let offset = offset_u32(self.bytes.len(), "asset reference buffer")?;
        let count = offset_u32(references.len(), "asset reference count")?;
        for reference in references {
            self.bytes
                .extend_from_slice(&self.order.write_u32(reference.type_id));
            self.bytes
                .extend_from_slice(&self.order.write_u32(reference.instance_id));
        }
        Ok((offset, count))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Read `count` reference pairs starting at byte `offset`.
pub fn read_references(
    buffer: &[u8],
    offset: u32,
    count: u32,
    order: ByteOrder,
) -> Result<Vec<AssetReference>, ManifestError> {
    let start = offset as usize;
    let end = (count as usize)
        .checked_mul(REFERENCE_SIZE)
        .and_then(|len| len.checked_add(start))
        .filter(|&end| end <= buffer.len())
        .ok_or_else(|| {
            corrupt(format!(
                "{count} references at offset {offset} overrun reference buffer of {} bytes",
                buffer.len()
            ))
        })?;

    Ok(buffer[start..end]
        .chunks_exact(REFERENCE_SIZE)
        .map(|pair| {
            let word = |i: usize| order.read_u32([pair[i], pair[i + 1], pair[i + 2], pair[i + 3]]);
            AssetReference::new(word(0), word(4))
        })
        .collect())
}

// ---------------------------------------------------------------------------
// External manifest names
// ---------------------------------------------------------------------------

/// Manifests a package depends on, parsed from the external manifest name
/// buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalManifests {
    /// The patch manifest this package is patched by, if any.
    pub patch: Option<String>,
    /// Plain external manifests, in buffer order.
    pub external: Vec<String>,
}

/// Builder for the external manifest name buffer.
#[derive(Debug, Clone, Default)]
pub struct ExternalManifestBuffer {
    bytes: Vec<u8>,
}

impl ExternalManifestBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, is_patch: bool) -> Result<(), ManifestError> {
        let encoded = string_to_latin1(name)?;
        self.bytes.push(if is_patch {
            PATCH_MANIFEST_TAG
        } else {
            EXTERNAL_MANIFEST_TAG
        });
        self.bytes.extend_from_slice(&encoded);
        self.bytes.push(0);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Parse every `[tag][name][NUL]` record of the buffer.
///
/// A later patch record replaces an earlier one.
pub fn read_external_manifests(buffer: &[u8]) -> Result<ExternalManifests, ManifestError> {
    let mut manifests = ExternalManifests::default();
    let mut rest = buffer;
    while let Some((&tag, tail)) = rest.split_first() {
        let len = tail.iter().position(|&b| b == 0).ok_or_else(|| {
            corrupt(format!(
                "external manifest name at offset {} is not NUL-terminated",
                buffer.len() - rest.len()
            ))
        })?;
        let name = latin1_to_string(&tail[..len]);
        if tag == PATCH_MANIFEST_TAG {
            manifests.patch = Some(name);
        } else {
            manifests.external.push(name);
        }
        rest = &tail[len + 1..];
    }
    Ok(manifests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetId;

    #[test]
    fn names_are_nul_terminated_and_addressable() {
        let mut names = NameBuffer::new();
        let a = names.add_name("Texture:Grass").unwrap();
        let b = names.add_name("").unwrap();
        let c = names.add_name("Model:Tree").unwrap();
        assert_eq!((a, b, c), (0, 14, 15));
        assert_eq!(names.len(), 26);

        let bytes = names.into_bytes();
        assert_eq!(read_name(&bytes, a).unwrap(), "Texture:Grass");
        assert_eq!(read_name(&bytes, b).unwrap(), "");
        assert_eq!(read_name(&bytes, c).unwrap(), "Model:Tree");
    }

    #[test]
    fn name_reader_rejects_bad_offsets() {
        let bytes = b"abc\0def".to_vec();
        assert!(read_name(&bytes, 4).is_err(), "missing terminator");
        assert!(read_name(&bytes, 100).is_err(), "out of range");
    }

    #[test]
    fn interior_nul_is_rejected() {
        let mut names = NameBuffer::new();
        assert!(names.add_name("bad\0name").is_err());
        assert!(names.is_empty());
    }

    #[test]
    fn high_bytes_read_as_latin1_and_write_back_unchanged() {
        let bytes = b"art/caf\xC9.tga\0".to_vec();
        let name = read_name(&bytes, 0).unwrap();
        assert_eq!(name, "art/caf\u{C9}.tga");

        let mut names = NameBuffer::new();
        names.add_name(&name).unwrap();
        assert_eq!(names.into_bytes(), bytes);
    }

    #[test]
    fn chars_outside_latin1_are_rejected() {
        let mut names = NameBuffer::new();
        assert!(matches!(
            names.add_name("Texture:\u{263A}"),
            Err(ManifestError::Corrupt { .. })
        ));
        assert!(names.is_empty());
    }

    #[test]
    fn references_round_through_buffer() {
        let mut refs = ReferenceBuffer::new(ByteOrder::Little);
        let first = refs.add_references(&[AssetId::new(1, 2)]).unwrap();
        let second = refs
            .add_references(&[AssetId::new(3, 4), AssetId::new(5, 6)])
            .unwrap();
        let empty = refs.add_references(&[]).unwrap();
        assert_eq!(first, (0, 1));
        assert_eq!(second, (8, 2));
        assert_eq!(empty, (24, 0));

        let bytes = refs.into_bytes();
        assert_eq!(&bytes[..8], &[1, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(
            read_references(&bytes, second.0, second.1, ByteOrder::Little).unwrap(),
            vec![AssetId::new(3, 4), AssetId::new(5, 6)]
        );
        assert!(read_references(&bytes, empty.0, 0, ByteOrder::Little)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn reference_overrun_is_corrupt() {
        let bytes = vec![0u8; 16];
        let err = read_references(&bytes, 8, 2, ByteOrder::Little).unwrap_err();
        assert!(matches!(err, ManifestError::Corrupt { .. }));
        assert!(read_references(&bytes, 0, u32::MAX, ByteOrder::Little).is_err());
    }

    #[test]
    fn external_manifests_split_patch_from_plain() {
        let mut buffer = ExternalManifestBuffer::new();
        buffer.add("global_common", false).unwrap();
        buffer.add("patch", true).unwrap();
        buffer.add("static", false).unwrap();
        let bytes = buffer.into_bytes();
        assert_eq!(bytes[0], EXTERNAL_MANIFEST_TAG);

        let parsed = read_external_manifests(&bytes).unwrap();
        assert_eq!(parsed.patch.as_deref(), Some("patch"));
        assert_eq!(parsed.external, vec!["global_common", "static"]);
    }

    #[test]
    fn unterminated_external_manifest_is_corrupt() {
        assert!(read_external_manifests(&[0, b'a', b'b']).is_err());
        assert_eq!(
            read_external_manifests(&[]).unwrap(),
            ExternalManifests::default()
        );
    }
}
