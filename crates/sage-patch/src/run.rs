//! One full extraction run: discover maps, reconcile them, write the patch.

use std::path::{Path, PathBuf};

use sage_manifest::store::ManifestStore;
use serde::Serialize;

use crate::config::PatchConfig;
use crate::discover::discover_maps;
use crate::filter::AssetFilter;
use crate::journal::DiscardJournal;
use crate::writer::{commit, CommitOutcome};
use crate::PatchError;

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Manifests processed, in processing order.
    pub maps: Vec<PathBuf>,
    pub outcome: CommitOutcome,
    pub journal: DiscardJournal,
}

/// Drives the reconciliation of every map under one root directory.
#[derive(Debug, Clone)]
pub struct FilterRun {
    root: PathBuf,
    config: PatchConfig,
}

impl FilterRun {
    pub fn new(root: impl Into<PathBuf>, config: PatchConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &PatchConfig {
        &self.config
    }

    /// Run to completion. The patch is written under the root directory.
    ///
    /// # Errors
    ///
    /// Any manifest, stream or output error aborts the run.
    pub fn execute(&self) -> Result<RunReport, PatchError> {
        let maps = discover_maps(&self.root, &self.config.manifest_file_name)?;
        tracing::info!(root = %self.root.display(), maps = maps.len(), "discovered maps");

        let mut filter = AssetFilter::new(&self.config);
        for path in &maps {
            let store = ManifestStore::open(path)?;
            filter.ingest(&store)?;
        }

        let (assets, journal) = filter.into_parts();
        let outcome = commit(&self.root, &self.config, &assets)?;
        Ok(RunReport {
            maps,
            outcome,
            journal,
        })
    }
}
