//! Record of every narrowing decision made by the asset filter.
//!
//! Each discard is logged as it happens; the [`DiscardJournal`] keeps the
//! same decisions as data so callers can query them or write them out as a
//! JSON report.
//!
//! # Example
//!
//! ```
//! use sage_manifest::asset::AssetId;
//! use sage_patch::journal::{DiscardEvent, DiscardJournal, DiscardReason};
//!
//! let mut journal = DiscardJournal::new();
//! journal.record_discard(DiscardEvent {
//!     asset: AssetId::new(1, 2),
//!     name: "GameMap:Alpine".to_owned(),
//!     map: "maps/alpine/map.manifest".to_owned(),
//!     reason: DiscardReason::ReservedType,
//! });
//!
//! assert_eq!(journal.len(), 1);
//! assert_eq!(journal.discards_of(AssetId::new(1, 2)).count(), 1);
//! ```

use sage_manifest::asset::{AssetId, StreamKind};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DiscardReason
// ---------------------------------------------------------------------------

/// Why an asset was left out of the patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscardReason {
    /// The asset's type is always map specific.
    ReservedType,
    /// A later map does not contain the asset.
    NotInAllStreams,
    /// A later map carries different bytes in the listed streams.
    ContentDiverged { streams: Vec<StreamKind> },
    /// The asset appeared in a later map but not in all earlier ones.
    NewAsset,
}

impl DiscardReason {
    /// Short log wording.
    pub fn describe(&self) -> &'static str {
        match self {
            DiscardReason::ReservedType => "map specific type",
            DiscardReason::NotInAllStreams => "not in all streams",
            DiscardReason::ContentDiverged { .. } => "different version",
            DiscardReason::NewAsset => "new asset, not in all streams",
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// One asset left out of the patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscardEvent {
    pub asset: AssetId,
    /// Qualified name of the discarded asset.
    pub name: String,
    /// The map being processed when the decision was made.
    pub map: String,
    pub reason: DiscardReason,
}

/// A surviving asset that points at an asset that was just discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingReference {
    pub discarded: AssetId,
    pub discarded_name: String,
    pub referenced_by: AssetId,
    pub referenced_by_name: String,
}

// ---------------------------------------------------------------------------
// DiscardJournal
// ---------------------------------------------------------------------------

/// Accumulates discard decisions and dangling-reference warnings in the
/// order they were made.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscardJournal {
    discards: Vec<DiscardEvent>,
    dangling: Vec<DanglingReference>,
}

impl DiscardJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_discard(&mut self, event: DiscardEvent) {
        self.discards.push(event);
    }

    pub fn record_dangling(&mut self, warning: DanglingReference) {
        self.dangling.push(warning);
    }

    /// Number of recorded discards.
    pub fn len(&self) -> usize {
        self.discards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.discards.is_empty()
    }

    pub fn discards(&self) -> &[DiscardEvent] {
        &self.discards
    }

    pub fn dangling_references(&self) -> &[DanglingReference] {
        &self.dangling
    }

    /// Discards of the given asset, across all maps.
    pub fn discards_of(&self, asset: AssetId) -> impl Iterator<Item = &DiscardEvent> {
        self.discards.iter().filter(move |e| e.asset == asset)
    }

    /// Dangling-reference warnings raised by discarding `asset`.
    pub fn dangling_to(&self, asset: AssetId) -> impl Iterator<Item = &DanglingReference> {
        self.dangling.iter().filter(move |w| w.discarded == asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(instance: u32, reason: DiscardReason) -> DiscardEvent {
        DiscardEvent {
            asset: AssetId::new(1, instance),
            name: format!("Type:{instance}"),
            map: "m".to_owned(),
            reason,
        }
    }

    #[test]
    fn queries_filter_by_asset() {
        let mut journal = DiscardJournal::new();
        journal.record_discard(event(1, DiscardReason::NotInAllStreams));
        journal.record_discard(event(2, DiscardReason::NewAsset));
        journal.record_dangling(DanglingReference {
            discarded: AssetId::new(1, 1),
            discarded_name: "Type:1".to_owned(),
            referenced_by: AssetId::new(1, 3),
            referenced_by_name: "Type:3".to_owned(),
        });

        assert_eq!(journal.len(), 2);
        assert_eq!(journal.discards_of(AssetId::new(1, 2)).count(), 1);
        assert_eq!(journal.dangling_to(AssetId::new(1, 1)).count(), 1);
        assert_eq!(journal.dangling_to(AssetId::new(1, 2)).count(), 0);
    }

    #[test]
    fn serializes_reason_with_kind_tag() {
        let reason = DiscardReason::ContentDiverged {
            streams: vec![StreamKind::Relocation],
        };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "content_diverged", "streams": ["Relocation"]})
        );
        let back: DiscardReason = serde_json::from_value(json).unwrap();
        assert_eq!(back, reason);
    }

    #[test]
    fn describe_wording() {
        assert_eq!(DiscardReason::ReservedType.describe(), "map specific type");
        assert_eq!(
            DiscardReason::ContentDiverged { streams: vec![] }.describe(),
            "different version"
        );
    }
}
