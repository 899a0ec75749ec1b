//! Writing linked manifest packages.
//!
//! [`PackageBuilder`] lays out a complete linked package the way the asset
//! toolchain does: the manifest, the three checksum-prefixed side-band
//! streams, and optional content data files. Tests and benchmarks use it to
//! build map fixtures.
//!
//! ```
//! use sage_manifest::package::{PackageAsset, PackageBuilder};
//! use sage_manifest::store::ManifestStore;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = PackageBuilder::new(0xC0FFEE)
//!     .asset(PackageAsset::new(1, 2, "Texture:Grass").instance(vec![1, 2, 3]))
//!     .write(dir.path(), "map")
//!     .unwrap();
//!
//! let store = ManifestStore::open(&path).unwrap();
//! assert_eq!(store.assets()[0].qualified_name, "Texture:Grass");
//! ```

use std::path::{Path, PathBuf};

use crate::asset::{AssetId, AssetReference, StreamKind};
use crate::buffers::{ExternalManifestBuffer, NameBuffer, ReferenceBuffer};
use crate::image::ManifestImage;
use crate::layout::{AssetEntry, ByteOrder, ManifestHeader};
use crate::ManifestError;

/// One asset to be written into a package.
#[derive(Debug, Clone, Default)]
pub struct PackageAsset {
    pub id: AssetId,
    pub type_hash: u32,
    pub instance_hash: u32,
    pub qualified_name: String,
    pub source: String,
    pub references: Vec<AssetReference>,
    pub instance: Vec<u8>,
    pub relocation: Vec<u8>,
    pub imports: Vec<u8>,
    pub content_data: Option<Vec<u8>>,
}

impl PackageAsset {
    pub fn new(type_id: u32, instance_id: u32, qualified_name: &str) -> Self {
        Self {
            id: AssetId::new(type_id, instance_id),
            qualified_name: qualified_name.to_owned(),
            source: format!("{qualified_name}.xml"),
            ..Default::default()
        }
    }

    pub fn hashes(mut self, type_hash: u32, instance_hash: u32) -> Self {
        self.type_hash = type_hash;
        self.instance_hash = instance_hash;
        self
    }

    pub fn source(mut self, source: &str) -> Self {
        self.source = source.to_owned();
        self
    }

    pub fn instance(mut self, bytes: Vec<u8>) -> Self {
        self.instance = bytes;
        self
    }

    pub fn relocation(mut self, bytes: Vec<u8>) -> Self {
        self.relocation = bytes;
        self
    }

    pub fn imports(mut self, bytes: Vec<u8>) -> Self {
        self.imports = bytes;
        self
    }

    pub fn references(mut self, references: Vec<AssetReference>) -> Self {
        self.references = references;
        self
    }

    pub fn content_data(mut self, bytes: Vec<u8>) -> Self {
        self.content_data = Some(bytes);
        self
    }

    fn stream(&self, stream: StreamKind) -> &[u8] {
        match stream {
            StreamKind::Instance => &self.instance,
            StreamKind::Relocation => &self.relocation,
            StreamKind::Imports => &self.imports,
        }
    }
}

fn chunk_size(bytes: &[u8], what: &str) -> Result<u32, ManifestError> {
    u32::try_from(bytes.len()).map_err(|_| ManifestError::Corrupt {
        details: format!("{what} of {} bytes exceeds 4 GiB", bytes.len()),
    })
}

fn add_total(total: u32, size: u32) -> Result<u32, ManifestError> {
    total.checked_add(size).ok_or_else(|| ManifestError::Corrupt {
        details: format!("total instance data size {total} + {size} exceeds 4 GiB"),
    })
}

/// Builder for a linked package.
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    stream_checksum: u32,
    all_types_hash: u32,
    order: ByteOrder,
    assets: Vec<PackageAsset>,
    external: Vec<(String, bool)>,
}

impl PackageBuilder {
    pub fn new(stream_checksum: u32) -> Self {
        Self {
            stream_checksum,
            all_types_hash: 0,
            order: ByteOrder::Little,
            assets: Vec::new(),
            external: Vec::new(),
        }
    }

    pub fn all_types_hash(mut self, hash: u32) -> Self {
        self.all_types_hash = hash;
        self
    }

    pub fn byte_order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        self
    }

    pub fn asset(mut self, asset: PackageAsset) -> Self {
        self.assets.push(asset);
        self
    }

    pub fn external_manifest(mut self, name: &str, is_patch: bool) -> Self {
        self.external.push((name.to_owned(), is_patch));
        self
    }

    /// Encode the manifest file.
    pub fn manifest_image(&self) -> Result<ManifestImage, ManifestError> {
        let mut names = NameBuffer::new();
        let mut sources = NameBuffer::new();
        let mut references = ReferenceBuffer::new(self.order);
        let mut external = ExternalManifestBuffer::new();
        for (name, is_patch) in &self.external {
            external.add(name, *is_patch)?;
        }

        let mut header = ManifestHeader {
            is_big_endian: self.order.is_big(),
            is_linked: true,
            version: 5,
            stream_checksum: self.stream_checksum,
            all_types_hash: self.all_types_hash,
            ..Default::default()
        };

        let mut entries = Vec::with_capacity(self.assets.len());
        for asset in &self.assets {
            let (asset_reference_offset, asset_reference_count) =
                references.add_references(&asset.references)?;
            let entry = AssetEntry {
                type_id: asset.id.type_id,
                instance_id: asset.id.instance_id,
                type_hash: asset.type_hash,
                instance_hash: asset.instance_hash,
                asset_reference_offset,
                asset_reference_count,
                name_offset: names.add_name(&asset.qualified_name)?,
                source_file_name_offset: sources.add_name(&asset.source)?,
                instance_data_size: chunk_size(&asset.instance, "instance chunk")?,
                relocation_data_size: chunk_size(&asset.relocation, "relocation chunk")?,
                imports_data_size: chunk_size(&asset.imports, "imports chunk")?,
            };
            header.total_instance_data_size =
                add_total(header.total_instance_data_size, entry.instance_data_size)?;
            header.max_instance_chunk_size =
                header.max_instance_chunk_size.max(entry.instance_data_size);
            header.max_relocation_chunk_size =
                header.max_relocation_chunk_size.max(entry.relocation_data_size);
            header.max_imports_chunk_size =
                header.max_imports_chunk_size.max(entry.imports_data_size);
            entries.push(entry);
        }

        let mut image = ManifestImage {
            header,
            entries,
            asset_references: references.into_bytes(),
            external_manifest_names: external.into_bytes(),
            asset_names: names.into_bytes(),
            source_file_names: sources.into_bytes(),
        };
        image.sync_header()?;
        Ok(image)
    }

    /// Write `<directory>/<name>.manifest`, its streams and content data
    /// files. Returns the manifest path.
    pub fn write(&self, directory: &Path, name: &str) -> Result<PathBuf, ManifestError> {
        let io = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| ManifestError::Io { path, source }
        };

        std::fs::create_dir_all(directory).map_err(io(directory))?;
        let manifest_path = directory.join(format!("{name}.manifest"));
        std::fs::write(&manifest_path, self.manifest_image()?.encode())
            .map_err(io(&manifest_path))?;

        for stream in StreamKind::ALL {
            let mut bytes = self.order.write_u32(self.stream_checksum).to_vec();
            for asset in &self.assets {
                bytes.extend_from_slice(asset.stream(stream));
            }
            let path = directory.join(format!("{name}.{}", stream.extension()));
            std::fs::write(&path, bytes).map_err(io(&path))?;
        }

        for asset in &self.assets {
            let Some(content) = &asset.content_data else {
                continue;
            };
            let path = directory.join(asset.id.content_data_path());
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(io(parent))?;
            }
            std::fs::write(&path, content).map_err(io(&path))?;
        }

        Ok(manifest_path)
    }
}
