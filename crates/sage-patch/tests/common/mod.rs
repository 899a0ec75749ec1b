//! In-memory map fixtures for filter tests.

#![allow(dead_code)]

use sage_manifest::layout::AssetEntry;
use sage_manifest::prelude::*;

/// A map held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryMap {
    pub label: String,
    pub assets: Vec<Asset>,
    pub chunks: Vec<Chunk>,
}

impl MemoryMap {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_owned(),
            ..Default::default()
        }
    }

    /// Append an asset with the given chunk and references.
    pub fn with(mut self, id: AssetId, name: &str, chunk: Chunk, references: Vec<AssetId>) -> Self {
        let entry = AssetEntry {
            type_id: id.type_id,
            instance_id: id.instance_id,
            instance_data_size: chunk.instance.len() as u32,
            relocation_data_size: chunk.relocation.len() as u32,
            imports_data_size: chunk.imports.len() as u32,
            ..Default::default()
        };
        let index = self.assets.len();
        self.assets.push(Asset::from_entry(
            index,
            &entry,
            name.to_owned(),
            String::new(),
            references,
            [4; 3],
        ));
        self.chunks.push(chunk);
        self
    }

    /// Append an asset without references.
    pub fn plain(self, id: AssetId, name: &str, instance: &[u8]) -> Self {
        self.with(id, name, chunk(instance, &[], &[]), Vec::new())
    }
}

pub fn chunk(instance: &[u8], relocation: &[u8], imports: &[u8]) -> Chunk {
    Chunk {
        instance: instance.to_vec(),
        relocation: relocation.to_vec(),
        imports: imports.to_vec(),
    }
}

impl AssetSource for MemoryMap {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn all_types_hash(&self) -> u32 {
        0xA11
    }

    fn assets(&self) -> &[Asset] {
        &self.assets
    }

    fn chunk(&self, asset: &Asset) -> Result<Chunk, ManifestError> {
        Ok(self.chunks[asset.index].clone())
    }

    fn content_data(&self, _asset: &Asset) -> Result<Option<Vec<u8>>, ManifestError> {
        Ok(None)
    }
}
