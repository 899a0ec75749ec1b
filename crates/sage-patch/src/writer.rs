//! Writes the reconciled asset set as a patch: one unlinked manifest plus a
//! standalone `.asset` file (and optional content data file) per asset.
//!
//! Nothing lands at its final path until every byte of the patch has been
//! written. The asset tree is built in a staging directory next to the output
//! and the manifest in a `.tmp` sibling; only then is the tree renamed into
//! place, followed by the manifest. A failure before that point removes the
//! staging directory and leaves earlier output untouched.

use std::fs;
use std::path::{Path, PathBuf};

use sage_manifest::asset::StreamKind;
use sage_manifest::buffers::{NameBuffer, ReferenceBuffer};
use sage_manifest::image::ManifestImage;
use sage_manifest::layout::{AssetEntry, AssetHeader, ByteOrder, ManifestHeader};
use serde::Serialize;

use crate::config::PatchConfig;
use crate::filter::FilterAsset;
use crate::PatchError;

/// Checksum written into the patch manifest header. Patches carry no
/// side-band streams, so no stream is ever checked against it.
pub const PATCH_STREAM_CHECKSUM: u32 = 0x1337_C0DE;

/// Manifest format version of produced patches.
pub const PATCH_VERSION: u16 = 5;

/// What a successful commit produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchSummary {
    pub manifest_path: PathBuf,
    pub asset_count: usize,
    pub total_instance_data_size: u32,
    pub asset_files: Vec<PathBuf>,
    pub content_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommitOutcome {
    Written(PatchSummary),
    /// The reconciled set was empty; nothing was written.
    Empty,
}

impl CommitOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, CommitOutcome::Empty)
    }

    pub fn summary(&self) -> Option<&PatchSummary> {
        match self {
            CommitOutcome::Written(summary) => Some(summary),
            CommitOutcome::Empty => None,
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PatchError + '_ {
    move |source| PatchError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn checked_add(total: u32, value: u32, what: &'static str) -> Result<u32, PatchError> {
    total
        .checked_add(value)
        .ok_or(PatchError::SizeOverflow { what })
}

/// Build the unlinked patch manifest for `assets`, in order.
///
/// The external manifest buffer is always empty and `all_types_hash` is
/// taken from the first asset's source manifest.
///
/// # Errors
///
/// [`PatchError::SizeOverflow`] if an aggregate exceeds its 32-bit field.
pub fn build_image(assets: &[FilterAsset]) -> Result<ManifestImage, PatchError> {
    let order = ByteOrder::Little;
    let mut names = NameBuffer::new();
    let mut sources = NameBuffer::new();
    let mut references = ReferenceBuffer::new(order);

    let mut header = ManifestHeader {
        is_big_endian: order.is_big(),
        is_linked: false,
        version: PATCH_VERSION,
        stream_checksum: PATCH_STREAM_CHECKSUM,
        all_types_hash: assets.first().map_or(0, FilterAsset::all_types_hash),
        ..Default::default()
    };

    let mut entries = Vec::with_capacity(assets.len());
    for filtered in assets {
        let asset = filtered.asset();
        let (asset_reference_offset, asset_reference_count) =
            references.add_references(&asset.references)?;
        let entry = AssetEntry {
            type_id: asset.type_id,
            instance_id: asset.instance_id,
            type_hash: asset.type_hash,
            instance_hash: asset.instance_hash,
            asset_reference_offset,
            asset_reference_count,
            name_offset: names.add_name(&asset.qualified_name)?,
            source_file_name_offset: sources.add_name(&asset.source)?,
            instance_data_size: asset.instance_data_size,
            relocation_data_size: asset.relocation_data_size,
            imports_data_size: asset.imports_data_size,
        };
        header.total_instance_data_size = checked_add(
            header.total_instance_data_size,
            entry.instance_data_size,
            "total instance data size",
        )?;
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
        external_manifest_names: Vec::new(),
        asset_names: names.into_bytes(),
        source_file_names: sources.into_bytes(),
    };
    image.sync_header()?;
    Ok(image)
}

/// Bytes of one standalone `.asset` file.
pub fn encode_asset_file(filtered: &FilterAsset) -> Vec<u8> {
    let asset = filtered.asset();
    let chunk = filtered.chunk();
    let header = AssetHeader {
        type_id: asset.type_id,
        instance_id: asset.instance_id,
        type_hash: asset.type_hash,
        instance_hash: asset.instance_hash,
        instance_data_size: chunk.instance.len() as u32,
        relocation_data_size: chunk.relocation.len() as u32,
        imports_data_size: chunk.imports.len() as u32,
        zero: 0,
    };
    let body: usize = StreamKind::ALL.iter().map(|&s| chunk.buffer(s).len()).sum();
    let mut out = Vec::with_capacity(AssetHeader::SIZE + body);
    out.extend_from_slice(&header.encode(ByteOrder::Little));
    for stream in StreamKind::ALL {
        out.extend_from_slice(chunk.buffer(stream));
    }
    out
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), PatchError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    fs::write(path, bytes).map_err(io_error(path))
}

/// Replace `asset_root` with the staged tree.
fn publish_tree(staged: &Path, asset_root: &Path) -> Result<(), PatchError> {
    if asset_root.exists() {
        fs::remove_dir_all(asset_root).map_err(io_error(asset_root))?;
    }
    fs::rename(staged, asset_root).map_err(io_error(asset_root))
}

/// Write the patch for `assets` under `output_dir`.
///
/// Returns [`CommitOutcome::Empty`] without touching the filesystem when
/// `assets` is empty. An existing `<name>/` asset tree from an earlier run is
/// replaced as a whole.
///
/// # Errors
///
/// [`PatchError::Io`] on any failed write, [`PatchError::SizeOverflow`]
/// from [`build_image`].
pub fn commit(
    output_dir: &Path,
    config: &PatchConfig,
    assets: &[FilterAsset],
) -> Result<CommitOutcome, PatchError> {
    if assets.is_empty() {
        tracing::info!("no assets common to all maps, nothing to write");
        return Ok(CommitOutcome::Empty);
    }

    let image = build_image(assets)?;
    fs::create_dir_all(output_dir).map_err(io_error(output_dir))?;
    let staging = tempfile::Builder::new()
        .prefix(&format!(".{}-", config.patch_name))
        .tempdir_in(output_dir)
        .map_err(io_error(output_dir))?;

    let asset_root = config.asset_root(output_dir);
    let mut asset_files = Vec::with_capacity(assets.len());
    let mut content_files = Vec::new();

    for filtered in assets {
        let asset = filtered.asset();
        let base = asset.file_base_path();
        let relative = format!("{}.asset", config.strip_prefix(&base));
        write_file(&staging.path().join(&relative), &encode_asset_file(filtered))?;
        tracing::debug!(asset = %asset.qualified_name, path = %relative, "staged asset");
        asset_files.push(asset_root.join(relative));

        if let Some(content) = filtered.content_data() {
            let content_path = asset.content_data_path();
            let relative = config.strip_prefix(&content_path);
            write_file(&staging.path().join(relative), content)?;
            tracing::debug!(asset = %asset.qualified_name, path = %relative, "staged content data");
            content_files.push(asset_root.join(relative));
        }
    }

    let manifest_path = config.manifest_path(output_dir);
    let manifest_tmp = manifest_path.with_extension("manifest.tmp");
    write_file(&manifest_tmp, &image.encode())?;

    let published = publish_tree(staging.path(), &asset_root).and_then(|()| {
        fs::rename(&manifest_tmp, &manifest_path).map_err(io_error(&manifest_path))
    });
    if published.is_err() {
        // Best effort.
        let _ = fs::remove_file(&manifest_tmp);
    }
    published?;

    let summary = PatchSummary {
        manifest_path,
        asset_count: image.entries.len(),
        total_instance_data_size: image.header.total_instance_data_size,
        asset_files,
        content_files,
    };
    tracing::info!(
        manifest = %summary.manifest_path.display(),
        assets = summary.asset_count,
        instance_bytes = summary.total_instance_data_size,
        "patch written"
    );
    Ok(CommitOutcome::Written(summary))
}
