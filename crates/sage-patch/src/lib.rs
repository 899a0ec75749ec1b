//! Sage Patch -- extracts the assets shared by every map into one patch.
//!
//! Every map directory under a root holds a linked manifest package. The
//! [`AssetFilter`](filter::AssetFilter) intersects their asset sets, keeping
//! only assets present in every map with byte-identical chunks, and the
//! [`writer`] emits the survivors as an unlinked patch manifest plus one
//! standalone file per asset.
//!
//! ```no_run
//! use sage_patch::prelude::*;
//!
//! let report = FilterRun::new("maps", PatchConfig::default()).execute()?;
//! if let Some(summary) = report.outcome.summary() {
//!     println!("{} shared assets", summary.asset_count);
//! }
//! # Ok::<(), sage_patch::PatchError>(())
//! ```

#![deny(unsafe_code)]

use std::path::PathBuf;

use sage_manifest::ManifestError;

pub mod config;
pub mod discover;
pub mod filter;
pub mod journal;
pub mod run;
pub mod writer;

/// Errors that abort a patch extraction run.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An aggregate of the patch no longer fits its 32-bit header field.
    #[error("{what} overflows the manifest header")]
    SizeOverflow { what: &'static str },
}

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::PatchConfig;
    pub use crate::discover::discover_maps;
    pub use crate::filter::{AssetFilter, FilterAsset, Fingerprints};
    pub use crate::journal::{DanglingReference, DiscardEvent, DiscardJournal, DiscardReason};
    pub use crate::run::{FilterRun, RunReport};
    pub use crate::writer::{build_image, commit, CommitOutcome, PatchSummary};
    pub use crate::PatchError;
}
