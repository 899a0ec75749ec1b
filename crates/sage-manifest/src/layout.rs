//! Fixed-size record layouts of the manifest package.
//!
//! Three records are defined here:
//!
//! - [`ManifestHeader`] (48 bytes): the first record of every `.manifest`
//!   file.
//! - [`AssetEntry`] (44 bytes): `asset_count` of these follow the header.
//! - [`AssetHeader`] (32 bytes): prefix of every standalone `.asset` file
//!   produced by the patch writer.
//!
//! Records are not self-describing. They are written as exactly `SIZE`
//! bytes with no framing, fields in declaration order, no padding.
//!
//! # Byte order
//!
//! Packages are little-endian unless the header's `is_big_endian` byte is
//! set. Every record has a `swap()` that reverses each multi-byte field in
//! place. Encoding with [`ByteOrder::Big`] swaps a copy before the raw
//! little-endian write; decoding a big-endian package swaps after the raw
//! read. The flag itself is a single byte at offset 0, so it can be read
//! before the byte order is known.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ByteOrder
// ---------------------------------------------------------------------------

/// On-disk byte order of a manifest package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

impl ByteOrder {
    /// Byte order declared by a header's `is_big_endian` flag.
    #[inline]
    pub fn from_flag(is_big_endian: bool) -> Self {
        if is_big_endian {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    #[inline]
    pub fn is_big(self) -> bool {
        self == ByteOrder::Big
    }

    /// Convert a raw little-endian `u32` read from disk into its value.
    #[inline]
    pub fn read_u32(self, bytes: [u8; 4]) -> u32 {
        let raw = u32::from_le_bytes(bytes);
        if self.is_big() {
            raw.swap_bytes()
        } else {
            raw
        }
    }

    /// Encode a `u32` in this byte order.
    #[inline]
    pub fn write_u32(self, value: u32) -> [u8; 4] {
        if self.is_big() {
            value.swap_bytes().to_le_bytes()
        } else {
            value.to_le_bytes()
        }
    }
}

/// Little-endian field cursor over a fixed-size record.
struct FieldReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn u8(&mut self) -> u8 {
        let v = self.bytes[self.pos];
        self.pos += 1;
        v
    }

    fn u16(&mut self) -> u16 {
        let v = u16::from_le_bytes([self.bytes[self.pos], self.bytes[self.pos + 1]]);
        self.pos += 2;
        v
    }

    fn u32(&mut self) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.bytes[self.pos..self.pos + 4]);
        self.pos += 4;
        u32::from_le_bytes(raw)
    }
}

// ---------------------------------------------------------------------------
// ManifestHeader
// ---------------------------------------------------------------------------

/// Header record at the start of every manifest file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManifestHeader {
    pub is_big_endian: bool,
    /// Packages whose chunk offsets are implied by entry order. Only linked
    /// packages can be opened as a [`ManifestStore`](crate::store::ManifestStore).
    pub is_linked: bool,
    pub version: u16,
    /// Must equal the first four bytes of each side-band stream.
    pub stream_checksum: u32,
    pub all_types_hash: u32,
    pub asset_count: u32,
    pub total_instance_data_size: u32,
    pub max_instance_chunk_size: u32,
    pub max_relocation_chunk_size: u32,
    pub max_imports_chunk_size: u32,
    pub asset_reference_buffer_size: u32,
    pub external_manifest_name_buffer_size: u32,
    pub asset_name_buffer_size: u32,
    pub source_file_name_buffer_size: u32,
}

impl ManifestHeader {
    /// Encoded size in bytes.
    pub const SIZE: usize = 48;

    /// Byte order declared by this header.
    pub fn byte_order(&self) -> ByteOrder {
        ByteOrder::from_flag(self.is_big_endian)
    }

    /// Reverse every multi-byte field in place.
    pub fn swap(&mut self) {
        self.version = self.version.swap_bytes();
        for field in [
            &mut self.stream_checksum,
            &mut self.all_types_hash,
            &mut self.asset_count,
            &mut self.total_instance_data_size,
            &mut self.max_instance_chunk_size,
            &mut self.max_relocation_chunk_size,
            &mut self.max_imports_chunk_size,
            &mut self.asset_reference_buffer_size,
            &mut self.external_manifest_name_buffer_size,
            &mut self.asset_name_buffer_size,
            &mut self.source_file_name_buffer_size,
        ] {
            *field = field.swap_bytes();
        }
    }

    /// Total length of the four variable buffers trailing the entry table.
    pub fn buffers_len(&self) -> u64 {
        self.asset_reference_buffer_size as u64
            + self.external_manifest_name_buffer_size as u64
            + self.asset_name_buffer_size as u64
            + self.source_file_name_buffer_size as u64
    }

    /// Decode a header. The byte order is taken from the record itself.
    pub fn decode(bytes: &[u8; Self::SIZE]) -> Self {
        let mut r = FieldReader::new(bytes);
        let mut header = Self {
            is_big_endian: r.u8() != 0,
            is_linked: r.u8() != 0,
            version: r.u16(),
            stream_checksum: r.u32(),
            all_types_hash: r.u32(),
            asset_count: r.u32(),
            total_instance_data_size: r.u32(),
            max_instance_chunk_size: r.u32(),
            max_relocation_chunk_size: r.u32(),
            max_imports_chunk_size: r.u32(),
            asset_reference_buffer_size: r.u32(),
            external_manifest_name_buffer_size: r.u32(),
            asset_name_buffer_size: r.u32(),
            source_file_name_buffer_size: r.u32(),
        };
        if header.is_big_endian {
            header.swap();
        }
        header
    }

    /// Encode the header in the given byte order.
    pub fn encode(&self, order: ByteOrder) -> [u8; Self::SIZE] {
        let mut h = *self;
        if order.is_big() {
            h.swap();
        }
        let mut out = [0u8; Self::SIZE];
        out[0] = h.is_big_endian as u8;
        out[1] = h.is_linked as u8;
        out[2..4].copy_from_slice(&h.version.to_le_bytes());
        let words = [
            h.stream_checksum,
            h.all_types_hash,
            h.asset_count,
            h.total_instance_data_size,
            h.max_instance_chunk_size,
            h.max_relocation_chunk_size,
            h.max_imports_chunk_size,
            h.asset_reference_buffer_size,
            h.external_manifest_name_buffer_size,
            h.asset_name_buffer_size,
            h.source_file_name_buffer_size,
        ];
        for (i, word) in words.iter().enumerate() {
            let at = 4 + i * 4;
            out[at..at + 4].copy_from_slice(&word.to_le_bytes());
        }
        out
    }
}

// ---------------------------------------------------------------------------
// AssetEntry
// ---------------------------------------------------------------------------

/// One row of the asset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssetEntry {
    pub type_id: u32,
    pub instance_id: u32,
    pub type_hash: u32,
    pub instance_hash: u32,
    /// Byte offset into the asset reference buffer.
    pub asset_reference_offset: u32,
    /// Number of `(type id, instance id)` pairs at that offset.
    pub asset_reference_count: u32,
    pub name_offset: u32,
    pub source_file_name_offset: u32,
    pub instance_data_size: u32,
    pub relocation_data_size: u32,
    pub imports_data_size: u32,
}

impl AssetEntry {
    /// Encoded size in bytes.
    pub const SIZE: usize = 44;

    fn fields_mut(&mut self) -> [&mut u32; 11] {
        [
            &mut self.type_id,
            &mut self.instance_id,
            &mut self.type_hash,
            &mut self.instance_hash,
            &mut self.asset_reference_offset,
            &mut self.asset_reference_count,
            &mut self.name_offset,
            &mut self.source_file_name_offset,
            &mut self.instance_data_size,
            &mut self.relocation_data_size,
            &mut self.imports_data_size,
        ]
    }

    /// Reverse every field in place.
    pub fn swap(&mut self) {
        for field in self.fields_mut() {
            *field = field.swap_bytes();
        }
    }

    /// Decode an entry stored in `order`.
    pub fn decode(bytes: &[u8; Self::SIZE], order: ByteOrder) -> Self {
        let mut r = FieldReader::new(bytes);
        let mut entry = Self::default();
        for field in entry.fields_mut() {
            *field = r.u32();
        }
        if order.is_big() {
            entry.swap();
        }
        entry
    }

    /// Encode the entry in `order`.
    pub fn encode(&self, order: ByteOrder) -> [u8; Self::SIZE] {
        let mut e = *self;
        if order.is_big() {
            e.swap();
        }
        let mut out = [0u8; Self::SIZE];
        for (i, field) in e.fields_mut().into_iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&field.to_le_bytes());
        }
        out
    }
}

// ---------------------------------------------------------------------------
// AssetHeader
// ---------------------------------------------------------------------------

/// Prefix of a standalone `.asset` file: identity, hashes and chunk sizes,
/// followed on disk by the three chunk buffers in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssetHeader {
    pub type_id: u32,
    pub instance_id: u32,
    pub type_hash: u32,
    pub instance_hash: u32,
    pub instance_data_size: u32,
    pub relocation_data_size: u32,
    pub imports_data_size: u32,
    /// Reserved, always zero.
    pub zero: u32,
}

impl AssetHeader {
    /// Encoded size in bytes.
    pub const SIZE: usize = 32;

    fn fields_mut(&mut self) -> [&mut u32; 8] {
        [
            &mut self.type_id,
            &mut self.instance_id,
            &mut self.type_hash,
            &mut self.instance_hash,
            &mut self.instance_data_size,
            &mut self.relocation_data_size,
            &mut self.imports_data_size,
            &mut self.zero,
        ]
    }

    pub fn swap(&mut self) {
        for field in self.fields_mut() {
            *field = field.swap_bytes();
        }
    }

    pub fn decode(bytes: &[u8; Self::SIZE], order: ByteOrder) -> Self {
        let mut r = FieldReader::new(bytes);
        let mut header = Self::default();
        for field in header.fields_mut() {
            *field = r.u32();
        }
        if order.is_big() {
            header.swap();
        }
        header
    }

    pub fn encode(&self, order: ByteOrder) -> [u8; Self::SIZE] {
        let mut h = *self;
        if order.is_big() {
            h.swap();
        }
        let mut out = [0u8; Self::SIZE];
        for (i, field) in h.fields_mut().into_iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&field.to_le_bytes());
        }
        out
    }
}
