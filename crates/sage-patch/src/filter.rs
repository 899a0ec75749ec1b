//! Cross-map asset reconciliation.
//!
//! The [`AssetFilter`] keeps a running set of assets and narrows it one map
//! at a time. After every map has been ingested, the set holds exactly the
//! assets that every map contains with identical chunk contents.
//!
//! # Algorithm
//!
//! 1. **First map** -- every asset with instance data seeds the set, except
//!    assets of a reserved type (map scripts, terrain atlases, the map
//!    itself), which never belong in a shared patch.
//! 2. **Each later map** -- every asset in the set is looked up by
//!    [`AssetId`] among the map's assets with instance data:
//!    - missing: discarded, and every remaining asset that references it
//!      raises a dangling-reference warning;
//!    - present with a different fingerprint in any of the three streams:
//!      discarded;
//!    - present and identical: kept.
//!
//!    Map assets that matched nothing are reported as new and dropped. The
//!    set only ever shrinks.
//!
//! The order of the first map is the order of the result; later maps never
//! reorder it.
//!
//! Discards are logged through `tracing` and recorded in a
//! [`DiscardJournal`].

use std::collections::HashMap;

use sage_manifest::asset::{Asset, AssetId, Chunk, StreamKind};
use sage_manifest::hash::fast_hash;
use sage_manifest::store::AssetSource;
use sage_manifest::ManifestError;
use serde::{Deserialize, Serialize};

use crate::config::PatchConfig;
use crate::journal::{DanglingReference, DiscardEvent, DiscardJournal, DiscardReason};

// ---------------------------------------------------------------------------
// Fingerprints
// ---------------------------------------------------------------------------

/// Content hashes of the three chunk buffers of one asset version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprints {
    pub instance: u32,
    pub relocation: u32,
    pub imports: u32,
}

impl Fingerprints {
    pub fn of(chunk: &Chunk) -> Self {
        Self {
            instance: fast_hash(&chunk.instance),
            relocation: fast_hash(&chunk.relocation),
            imports: fast_hash(&chunk.imports),
        }
    }

    pub fn get(&self, stream: StreamKind) -> u32 {
        match stream {
            StreamKind::Instance => self.instance,
            StreamKind::Relocation => self.relocation,
            StreamKind::Imports => self.imports,
        }
    }

    /// Streams whose fingerprint differs from `other`'s.
    pub fn diverging(&self, other: &Fingerprints) -> Vec<StreamKind> {
        StreamKind::ALL
            .into_iter()
            .filter(|&stream| self.get(stream) != other.get(stream))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// FilterAsset
// ---------------------------------------------------------------------------

/// An asset of the running set, with its data loaded eagerly.
#[derive(Debug, Clone)]
pub struct FilterAsset {
    asset: Asset,
    chunk: Chunk,
    content_data: Option<Vec<u8>>,
    fingerprints: Fingerprints,
    all_types_hash: u32,
}

impl FilterAsset {
    /// Load `asset`'s chunk and content data from `source` and fingerprint
    /// the chunk.
    pub fn load<S: AssetSource + ?Sized>(
        source: &S,
        asset: &Asset,
    ) -> Result<Self, ManifestError> {
        let chunk = source.chunk(asset)?;
        let content_data = source.content_data(asset)?;
        let fingerprints = Fingerprints::of(&chunk);
        Ok(Self {
            asset: asset.clone(),
            chunk,
            content_data,
            fingerprints,
            all_types_hash: source.all_types_hash(),
        })
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn id(&self) -> AssetId {
        self.asset.id()
    }

    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }

    pub fn content_data(&self) -> Option<&[u8]> {
        self.content_data.as_deref()
    }

    pub fn fingerprints(&self) -> Fingerprints {
        self.fingerprints
    }

    /// `all_types_hash` of the manifest this asset was loaded from.
    pub fn all_types_hash(&self) -> u32 {
        self.all_types_hash
    }
}

// ---------------------------------------------------------------------------
// AssetFilter
// ---------------------------------------------------------------------------

/// The running set of assets common to every map ingested so far.
#[derive(Debug, Default)]
pub struct AssetFilter {
    assets: Vec<FilterAsset>,
    reserved_type_ids: Vec<u32>,
    maps_ingested: usize,
    journal: DiscardJournal,
}

impl AssetFilter {
    pub fn new(config: &PatchConfig) -> Self {
        Self::with_reserved_types(config.reserved_type_ids())
    }

    /// A filter excluding the given type ids when seeding.
    pub fn with_reserved_types(reserved_type_ids: Vec<u32>) -> Self {
        Self {
            reserved_type_ids,
            ..Default::default()
        }
    }

    /// Narrow the running set by one map. The first call seeds it.
    ///
    /// # Errors
    ///
    /// Propagates any error loading chunk or content data from `source`.
    pub fn ingest<S: AssetSource + ?Sized>(&mut self, source: &S) -> Result<(), ManifestError> {
        let label = source.label();
        tracing::info!(map = %label, assets = source.assets().len(), "ingesting map");
        if self.maps_ingested == 0 {
            self.seed(source, &label)?;
        } else {
            self.narrow(source, &label)?;
        }
        self.maps_ingested += 1;
        tracing::info!(map = %label, remaining = self.assets.len(), "map ingested");
        Ok(())
    }

    fn seed<S: AssetSource + ?Sized>(
        &mut self,
        source: &S,
        label: &str,
    ) -> Result<(), ManifestError> {
        for asset in source.assets().iter().filter(|a| a.instance_data_size > 0) {
            if self.reserved_type_ids.contains(&asset.type_id) {
                self.discard(asset, label, DiscardReason::ReservedType);
                continue;
            }
            self.assets.push(FilterAsset::load(source, asset)?);
        }
        Ok(())
    }

    fn narrow<S: AssetSource + ?Sized>(
        &mut self,
        source: &S,
        label: &str,
    ) -> Result<(), ManifestError> {
        let candidates: Vec<&Asset> = source
            .assets()
            .iter()
            .filter(|a| a.instance_data_size > 0)
            .collect();
        let mut by_id: HashMap<AssetId, usize> = HashMap::with_capacity(candidates.len());
        for (slot, asset) in candidates.iter().enumerate() {
            by_id.entry(asset.id()).or_insert(slot);
        }
        let mut consumed = vec![false; candidates.len()];
        let mut keep = vec![true; self.assets.len()];

        for i in 0..self.assets.len() {
            let id = self.assets[i].id();
            let Some(&slot) = by_id.get(&id) else {
                keep[i] = false;
                let discarded = self.assets[i].asset.clone();
                self.discard(&discarded, label, DiscardReason::NotInAllStreams);
                self.warn_dangling(&discarded, i, &keep);
                continue;
            };

            consumed[slot] = true;
            let peer = Fingerprints::of(&source.chunk(candidates[slot])?);
            let streams = self.assets[i].fingerprints.diverging(&peer);
            if !streams.is_empty() {
                keep[i] = false;
                let discarded = self.assets[i].asset.clone();
                self.discard(&discarded, label, DiscardReason::ContentDiverged { streams });
            }
        }

        for (asset, _) in candidates
            .iter()
            .zip(&consumed)
            .filter(|&(_, &consumed)| !consumed)
        {
            self.discard(asset, label, DiscardReason::NewAsset);
        }

        self.assets = std::mem::take(&mut self.assets)
            .into_iter()
            .zip(keep)
            .filter_map(|(asset, keep)| keep.then_some(asset))
            .collect();
        Ok(())
    }

    fn discard(&mut self, asset: &Asset, label: &str, reason: DiscardReason) {
        match &reason {
            DiscardReason::ContentDiverged { streams } => tracing::info!(
                asset = %asset.qualified_name,
                map = %label,
                streams = ?streams,
                "discarding asset, {}",
                reason.describe()
            ),
            _ => tracing::info!(
                asset = %asset.qualified_name,
                map = %label,
                "discarding asset, {}",
                reason.describe()
            ),
        }
        self.journal.record_discard(DiscardEvent {
            asset: asset.id(),
            name: asset.qualified_name.clone(),
            map: label.to_owned(),
            reason,
        });
    }

    /// Warn once for every asset still in the set (other than the discarded
    /// one at `index`) that references `discarded`.
    fn warn_dangling(&mut self, discarded: &Asset, index: usize, keep: &[bool]) {
        let id = discarded.id();
        for (j, holder) in self.assets.iter().enumerate() {
            if j == index || !keep[j] || !holder.asset.references_id(id) {
                continue;
            }
            tracing::warn!(
                asset = %discarded.qualified_name,
                referenced_by = %holder.asset.qualified_name,
                "discarded asset is still referenced"
            );
            self.journal.record_dangling(DanglingReference {
                discarded: id,
                discarded_name: discarded.qualified_name.clone(),
                referenced_by: holder.id(),
                referenced_by_name: holder.asset.qualified_name.clone(),
            });
        }
    }

    /// The running set, in first-map order.
    pub fn assets(&self) -> &[FilterAsset] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn maps_ingested(&self) -> usize {
        self.maps_ingested
    }

    pub fn journal(&self) -> &DiscardJournal {
        &self.journal
    }

    pub fn into_parts(self) -> (Vec<FilterAsset>, DiscardJournal) {
        (self.assets, self.journal)
    }
}
