//! Run configuration.

use std::path::Path;

use sage_manifest::hash::type_id_of;

/// Asset types that are always specific to one map and never shared through
/// the patch.
pub const RESERVED_TYPE_NAMES: [&str; 3] = ["GameScriptList", "TerrainTextureAtlas", "GameMap"];

/// Settings for one patch extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchConfig {
    /// File name of the manifest inside each map directory.
    pub manifest_file_name: String,
    /// Base name of the produced manifest and its asset directory.
    pub patch_name: String,
    /// Logical path prefix removed from asset paths when writing output.
    pub path_prefix: String,
    /// Type names excluded when seeding the filter from the first map.
    pub reserved_types: Vec<String>,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            manifest_file_name: "map.manifest".to_owned(),
            patch_name: "patch".to_owned(),
            path_prefix: "data/".to_owned(),
            reserved_types: RESERVED_TYPE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PatchConfig {
    /// Type ids of the reserved types.
    pub fn reserved_type_ids(&self) -> Vec<u32> {
        self.reserved_types.iter().map(|name| type_id_of(name)).collect()
    }

    /// `path` with the logical prefix removed. Paths without the prefix are
    /// returned unchanged.
    pub fn strip_prefix<'a>(&self, path: &'a str) -> &'a str {
        path.strip_prefix(self.path_prefix.as_str()).unwrap_or(path)
    }

    /// Path of the produced manifest under `output_dir`.
    pub fn manifest_path(&self, output_dir: &Path) -> std::path::PathBuf {
        output_dir.join(format!("{}.manifest", self.patch_name))
    }

    /// Root of the per-asset output files under `output_dir`.
    pub fn asset_root(&self, output_dir: &Path) -> std::path::PathBuf {
        output_dir.join(&self.patch_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PatchConfig::default();
        assert_eq!(config.manifest_file_name, "map.manifest");
        assert_eq!(config.patch_name, "patch");
        assert_eq!(config.reserved_type_ids().len(), 3);
        assert!(config.reserved_type_ids().contains(&type_id_of("GameMap")));
    }

    #[test]
    fn strip_prefix_only_removes_leading_prefix() {
        let config = PatchConfig::default();
        assert_eq!(config.strip_prefix("data/assets/a/b"), "assets/a/b");
        assert_eq!(config.strip_prefix("other/data/x"), "other/data/x");
    }

    #[test]
    fn output_paths() {
        let config = PatchConfig {
            patch_name: "common".to_owned(),
            ..Default::default()
        };
        let root = Path::new("/maps");
        assert_eq!(config.manifest_path(root), Path::new("/maps/common.manifest"));
        assert_eq!(config.asset_root(root), Path::new("/maps/common"));
    }
}
