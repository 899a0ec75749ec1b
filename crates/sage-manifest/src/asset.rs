//! Resolved assets, their identities and chunk data.
//!
//! An [`Asset`] is the self-contained view of one [`AssetEntry`] after its
//! names and references have been resolved against the manifest buffers and
//! its side-band stream offsets have been computed. Chunk bytes are not part
//! of the asset; they are loaded on demand through the owning store.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::layout::AssetEntry;

/// Length of the checksum prefix of every side-band stream. Chunk data of the
/// first asset starts right after it.
pub const STREAM_DATA_START: u64 = 4;

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// Logical identity of an asset: `(type id, instance id)`.
///
/// Unique within one manifest; the same asset in two maps shares its id.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId {
    pub type_id: u32,
    pub instance_id: u32,
}

impl AssetId {
    #[inline]
    pub fn new(type_id: u32, instance_id: u32) -> Self {
        Self {
            type_id,
            instance_id,
        }
    }

    /// Logical path of the standalone `.asset` file, without extension,
    /// relative to the map directory.
    pub fn file_base_path(self) -> String {
        format!("data/assets/{:08x}/{:08x}", self.type_id, self.instance_id)
    }

    /// Logical path of the optional content data file, relative to the map
    /// directory.
    pub fn content_data_path(self) -> String {
        format!(
            "data/cdata/{:08x}/{:08x}.cdata",
            self.type_id, self.instance_id
        )
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({:08x}:{:08x})", self.type_id, self.instance_id)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}:{:08x}", self.type_id, self.instance_id)
    }
}

/// A pointer from one asset to another, by identity.
pub type AssetReference = AssetId;

// ---------------------------------------------------------------------------
// StreamKind
// ---------------------------------------------------------------------------

/// The three side-band data streams of a linked package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    Instance,
    Relocation,
    Imports,
}

impl StreamKind {
    pub const ALL: [StreamKind; 3] = [
        StreamKind::Instance,
        StreamKind::Relocation,
        StreamKind::Imports,
    ];

    /// File extension of the stream next to the manifest.
    pub fn extension(self) -> &'static str {
        match self {
            StreamKind::Instance => "bin",
            StreamKind::Relocation => "relo",
            StreamKind::Imports => "imp",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StreamKind::Instance => "instance",
            StreamKind::Relocation => "relocation",
            StreamKind::Imports => "imports",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

/// One asset of a manifest with names, references and stream offsets
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Position in the manifest's entry table.
    pub index: usize,
    pub type_id: u32,
    pub instance_id: u32,
    pub type_hash: u32,
    pub instance_hash: u32,
    /// `TypeName:InstanceName`.
    pub qualified_name: String,
    /// Source file the asset was built from.
    pub source: String,
    pub references: Vec<AssetReference>,
    pub instance_data_size: u32,
    pub relocation_data_size: u32,
    pub imports_data_size: u32,
    /// Absolute offsets of this asset's chunks in the `.bin`, `.relo` and
    /// `.imp` streams.
    pub instance_offset: u64,
    pub relocation_offset: u64,
    pub imports_offset: u64,
}

impl Asset {
    /// Build an asset from its table entry. `offsets` are the stream cursors
    /// (instance, relocation, imports) reached after all prior entries.
    pub fn from_entry(
        index: usize,
        entry: &AssetEntry,
        qualified_name: String,
        source: String,
        references: Vec<AssetReference>,
        offsets: [u64; 3],
    ) -> Self {
        Self {
            index,
            type_id: entry.type_id,
            instance_id: entry.instance_id,
            type_hash: entry.type_hash,
            instance_hash: entry.instance_hash,
            qualified_name,
            source,
            references,
            instance_data_size: entry.instance_data_size,
            relocation_data_size: entry.relocation_data_size,
            imports_data_size: entry.imports_data_size,
            instance_offset: offsets[0],
            relocation_offset: offsets[1],
            imports_offset: offsets[2],
        }
    }

    #[inline]
    pub fn id(&self) -> AssetId {
        AssetId::new(self.type_id, self.instance_id)
    }

    /// Whether this asset points at `target`.
    pub fn references_id(&self, target: AssetId) -> bool {
        self.references.contains(&target)
    }

    /// Declared chunk size in the given stream.
    pub fn data_size(&self, stream: StreamKind) -> u32 {
        match stream {
            StreamKind::Instance => self.instance_data_size,
            StreamKind::Relocation => self.relocation_data_size,
            StreamKind::Imports => self.imports_data_size,
        }
    }

    /// Absolute offset of this asset's chunk in the given stream.
    pub fn stream_offset(&self, stream: StreamKind) -> u64 {
        match stream {
            StreamKind::Instance => self.instance_offset,
            StreamKind::Relocation => self.relocation_offset,
            StreamKind::Imports => self.imports_offset,
        }
    }

    pub fn file_base_path(&self) -> String {
        self.id().file_base_path()
    }

    pub fn content_data_path(&self) -> String {
        self.id().content_data_path()
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name)
    }
}

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// The three raw buffers backing one asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    pub instance: Vec<u8>,
    pub relocation: Vec<u8>,
    pub imports: Vec<u8>,
}

impl Chunk {
    pub fn buffer(&self, stream: StreamKind) -> &[u8] {
        match stream {
            StreamKind::Instance => &self.instance,
            StreamKind::Relocation => &self.relocation,
            StreamKind::Imports => &self.imports,
        }
    }

    pub fn buffer_mut(&mut self, stream: StreamKind) -> &mut Vec<u8> {
        match stream {
            StreamKind::Instance => &mut self.instance,
            StreamKind::Relocation => &mut self.relocation,
            StreamKind::Imports => &mut self.imports,
        }
    }
}
