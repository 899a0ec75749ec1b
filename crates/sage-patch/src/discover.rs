//! Map directory discovery.

use std::fs;
use std::path::{Path, PathBuf};

use crate::PatchError;

/// Manifest paths of the immediate subdirectories of `root` that contain
/// `manifest_file_name`, sorted by path.
///
/// # Errors
///
/// [`PatchError::Io`] if `root` cannot be listed.
pub fn discover_maps(root: &Path, manifest_file_name: &str) -> Result<Vec<PathBuf>, PatchError> {
    let io = |source: std::io::Error| PatchError::Io {
        path: root.to_path_buf(),
        source,
    };
    let mut manifests = Vec::new();
    for entry in fs::read_dir(root).map_err(io)? {
        let entry = entry.map_err(io)?;
        let directory = entry.path();
        if !directory.is_dir() {
            continue;
        }
        let manifest = directory.join(manifest_file_name);
        if manifest.is_file() {
            manifests.push(manifest);
        } else {
            tracing::debug!(directory = %directory.display(), "no manifest, skipping");
        }
    }
    manifests.sort();
    Ok(manifests)
}
