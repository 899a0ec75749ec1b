//! Whole-manifest decoding and encoding.
//!
//! A [`ManifestImage`] is the in-memory form of a `.manifest` file: header,
//! entry table and the four variable buffers, with no side-band streams
//! attached. It decodes any manifest, linked or not, which makes it the tool
//! for inspecting patch manifests; [`ManifestStore`](crate::store::ManifestStore)
//! builds on it for linked packages.
//!
//! Layout on disk:
//!
//! ```text
//! ManifestHeader                      48 bytes
//! AssetEntry * asset_count            44 bytes each
//! asset reference buffer              asset_reference_buffer_size
//! external manifest name buffer       external_manifest_name_buffer_size
//! asset name buffer                   asset_name_buffer_size
//! source file name buffer             source_file_name_buffer_size
//! ```
//!
//! The file must end exactly after the last buffer.

use crate::asset::AssetReference;
use crate::buffers::{self, ExternalManifests};
use crate::layout::{AssetEntry, ManifestHeader};
use crate::ManifestError;

/// Decoded contents of a manifest file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestImage {
    pub header: ManifestHeader,
    pub entries: Vec<AssetEntry>,
    pub asset_references: Vec<u8>,
    pub external_manifest_names: Vec<u8>,
    pub asset_names: Vec<u8>,
    pub source_file_names: Vec<u8>,
}

impl ManifestImage {
    /// Decode a manifest, validating that the declared table and buffer sizes
    /// account for every byte of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, ManifestError> {
        let header_bytes: &[u8; ManifestHeader::SIZE] = bytes
            .get(..ManifestHeader::SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| ManifestError::Corrupt {
                details: format!(
                    "file is {} bytes, shorter than the {}-byte header",
                    bytes.len(),
                    ManifestHeader::SIZE
                ),
            })?;
        let header = ManifestHeader::decode(header_bytes);
        let order = header.byte_order();

        let table_len = header.asset_count as u64 * AssetEntry::SIZE as u64;
        let expected = ManifestHeader::SIZE as u64 + table_len + header.buffers_len();
        if expected != bytes.len() as u64 {
            return Err(ManifestError::Corrupt {
                details: format!(
                    "header declares {} assets and {} buffer bytes ({expected} bytes total), file is {} bytes",
                    header.asset_count,
                    header.buffers_len(),
                    bytes.len()
                ),
            });
        }

        let mut cursor = ManifestHeader::SIZE;
        let mut take = move |len: usize| {
            let slice = &bytes[cursor..cursor + len];
            cursor += len;
            slice
        };

        let entries = take(table_len as usize)
            .chunks_exact(AssetEntry::SIZE)
            .map(|raw| {
                let mut record = [0u8; AssetEntry::SIZE];
                record.copy_from_slice(raw);
                AssetEntry::decode(&record, order)
            })
            .collect();
        let asset_references = take(header.asset_reference_buffer_size as usize).to_vec();
        let external_manifest_names =
            take(header.external_manifest_name_buffer_size as usize).to_vec();
        let asset_names = take(header.asset_name_buffer_size as usize).to_vec();
        let source_file_names = take(header.source_file_name_buffer_size as usize).to_vec();

        Ok(Self {
            header,
            entries,
            asset_references,
            external_manifest_names,
            asset_names,
            source_file_names,
        })
    }

    /// Encode in the header's byte order.
    ///
    /// The header's count and buffer-size fields are written as stored; use
    /// [`sync_header`](Self::sync_header) first when the tables were edited.
    pub fn encode(&self) -> Vec<u8> {
        let order = self.header.byte_order();
        let mut out = Vec::with_capacity(
            ManifestHeader::SIZE
                + self.entries.len() * AssetEntry::SIZE
                + self.header.buffers_len() as usize,
        );
        out.extend_from_slice(&self.header.encode(order));
        for entry in &self.entries {
            out.extend_from_slice(&entry.encode(order));
        }
        out.extend_from_slice(&self.asset_references);
        out.extend_from_slice(&self.external_manifest_names);
        out.extend_from_slice(&self.asset_names);
        out.extend_from_slice(&self.source_file_names);
        out
    }

    /// Set the header's asset count and buffer sizes from the actual tables.
    pub fn sync_header(&mut self) -> Result<(), ManifestError> {
        let len = |n: usize, what: &str| {
            u32::try_from(n).map_err(|_| ManifestError::Corrupt {
                details: format!("{what} of {n} does not fit the header"),
            })
        };
        self.header.asset_count = len(self.entries.len(), "asset count")?;
        self.header.asset_reference_buffer_size =
            len(self.asset_references.len(), "asset reference buffer")?;
        self.header.external_manifest_name_buffer_size =
            len(self.external_manifest_names.len(), "external manifest name buffer")?;
        self.header.asset_name_buffer_size = len(self.asset_names.len(), "asset name buffer")?;
        self.header.source_file_name_buffer_size =
            len(self.source_file_names.len(), "source file name buffer")?;
        Ok(())
    }

    pub fn asset_name(&self, entry: &AssetEntry) -> Result<String, ManifestError> {
        buffers::read_name(&self.asset_names, entry.name_offset)
    }

    pub fn source_file_name(&self, entry: &AssetEntry) -> Result<String, ManifestError> {
        buffers::read_name(&self.source_file_names, entry.source_file_name_offset)
    }

    pub fn asset_references(
        &self,
        entry: &AssetEntry,
    ) -> Result<Vec<AssetReference>, ManifestError> {
        buffers::read_references(
            &self.asset_references,
            entry.asset_reference_offset,
            entry.asset_reference_count,
            self.header.byte_order(),
        )
    }

    pub fn external_manifests(&self) -> Result<ExternalManifests, ManifestError> {
        buffers::read_external_manifests(&self.external_manifest_names)
    }
}
