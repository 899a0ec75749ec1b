//! Linked manifest packages on disk.
//!
//! A package is a `<name>.manifest` file plus three side-band streams next to
//! it (`<name>.bin`, `<name>.relo`, `<name>.imp`). Each stream starts with the
//! header's `stream_checksum` and then holds the chunks of every asset back to
//! back in entry-table order, so an asset's offset is the sum of the sizes of
//! all entries before it. [`ManifestStore::open`] walks the table once and
//! caches every offset on the [`Asset`].
//!
//! Chunk bytes and content data are never cached; each
//! [`chunk`](ManifestStore::chunk) call re-reads the streams.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::asset::{Asset, Chunk, StreamKind, STREAM_DATA_START};
use crate::buffers::ExternalManifests;
use crate::image::ManifestImage;
use crate::layout::{ByteOrder, ManifestHeader};
use crate::ManifestError;

// ---------------------------------------------------------------------------
// AssetSource
// ---------------------------------------------------------------------------

/// Read access to the assets of one map, as the patch filter needs it.
pub trait AssetSource {
    /// Human-readable name of the source, used in log lines.
    fn label(&self) -> String;

    /// The manifest's global type hash.
    fn all_types_hash(&self) -> u32;

    /// All assets in table order.
    fn assets(&self) -> &[Asset];

    /// Load the three chunk buffers of `asset`.
    fn chunk(&self, asset: &Asset) -> Result<Chunk, ManifestError>;

    /// Load the standalone content data of `asset`, `None` when it has none.
    fn content_data(&self, asset: &Asset) -> Result<Option<Vec<u8>>, ManifestError>;
}

// ---------------------------------------------------------------------------
// ManifestStore
// ---------------------------------------------------------------------------

/// An opened linked manifest package.
#[derive(Debug)]
pub struct ManifestStore {
    directory: PathBuf,
    name: String,
    header: ManifestHeader,
    assets: Vec<Asset>,
    external: ExternalManifests,
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ManifestError + '_ {
    move |source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl ManifestStore {
    /// Open the package whose manifest file is `path`.
    ///
    /// # Errors
    ///
    /// - [`ManifestError::Io`] if the manifest or a stream cannot be read.
    /// - [`ManifestError::Corrupt`] if the declared sizes do not match the
    ///   file, or a name or reference lies outside its buffer.
    /// - [`ManifestError::UnsupportedFormat`] for unlinked packages.
    /// - [`ManifestError::ChecksumMismatch`] if a stream does not start with
    ///   the header's checksum.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| ManifestError::Corrupt {
                details: format!("'{}' has no file name", path.display()),
            })?;

        let bytes = std::fs::read(path).map_err(io_error(path))?;
        let image = ManifestImage::decode(&bytes)?;
        if !image.header.is_linked {
            return Err(ManifestError::UnsupportedFormat {
                reason: "only linked streams are supported".to_owned(),
            });
        }

        let mut store = Self {
            directory,
            name,
            header: image.header,
            assets: Vec::with_capacity(image.entries.len()),
            external: ExternalManifests::default(),
        };

        for stream in StreamKind::ALL {
            store.verify_stream_checksum(stream)?;
        }

        let mut offsets = [STREAM_DATA_START; 3];
        for (index, entry) in image.entries.iter().enumerate() {
            let asset = Asset::from_entry(
                index,
                entry,
                image.asset_name(entry)?,
                image.source_file_name(entry)?,
                image.asset_references(entry)?,
                offsets,
            );
            offsets[0] += entry.instance_data_size as u64;
            offsets[1] += entry.relocation_data_size as u64;
            offsets[2] += entry.imports_data_size as u64;
            store.assets.push(asset);
        }
        store.external = image.external_manifests()?;

        tracing::debug!(
            manifest = %store,
            assets = store.assets.len(),
            patch = ?store.external.patch,
            external = store.external.external.len(),
            "opened manifest"
        );
        Ok(store)
    }

    /// Path of a side-band stream of this package.
    pub fn stream_path(&self, stream: StreamKind) -> PathBuf {
        self.directory
            .join(format!("{}.{}", self.name, stream.extension()))
    }

    /// Path of the manifest file.
    pub fn manifest_path(&self) -> PathBuf {
        self.directory.join(format!("{}.manifest", self.name))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn verify_stream_checksum(&self, stream: StreamKind) -> Result<(), ManifestError> {
        let path = self.stream_path(stream);
        let file = File::open(&path).map_err(io_error(&path))?;
        let mut head = Vec::with_capacity(4);
        file.take(STREAM_DATA_START)
            .read_to_end(&mut head)
            .map_err(io_error(&path))?;
        let prefix: [u8; 4] = head
            .as_slice()
            .try_into()
            .map_err(|_| ManifestError::TruncatedStream {
                stream,
                offset: 0,
                expected: STREAM_DATA_START as u32,
                actual: head.len() as u32,
            })?;
        let found = self.byte_order().read_u32(prefix);
        if found != self.header.stream_checksum {
            return Err(ManifestError::ChecksumMismatch {
                stream,
                expected: self.header.stream_checksum,
                found,
            });
        }
        Ok(())
    }

    fn read_stream(&self, asset: &Asset, stream: StreamKind) -> Result<Vec<u8>, ManifestError> {
        let expected = asset.data_size(stream);
        let offset = asset.stream_offset(stream);
        if expected == 0 {
            return Ok(Vec::new());
        }

        let path = self.stream_path(stream);
        let mut file = File::open(&path).map_err(io_error(&path))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(io_error(&path))?;
        let mut buffer = Vec::with_capacity(expected as usize);
        file.take(expected as u64)
            .read_to_end(&mut buffer)
            .map_err(io_error(&path))?;
        if buffer.len() != expected as usize {
            return Err(ManifestError::TruncatedStream {
                stream,
                offset,
                expected,
                actual: buffer.len() as u32,
            });
        }
        Ok(buffer)
    }

    /// Read the three chunk buffers of `asset` from the side-band streams.
    ///
    /// # Errors
    ///
    /// [`ManifestError::TruncatedStream`] if a stream ends before the
    /// declared chunk size.
    pub fn chunk(&self, asset: &Asset) -> Result<Chunk, ManifestError> {
        let mut chunk = Chunk::default();
        for stream in StreamKind::ALL {
            *chunk.buffer_mut(stream) = self.read_stream(asset, stream)?;
        }
        Ok(chunk)
    }

    /// Read the standalone content data of `asset`, if the file exists.
    pub fn content_data(&self, asset: &Asset) -> Result<Option<Vec<u8>>, ManifestError> {
        let path = self.directory.join(asset.content_data_path());
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path)(e)),
        }
    }

    pub fn header(&self) -> &ManifestHeader {
        &self.header
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order()
    }

    pub fn is_linked(&self) -> bool {
        self.header.is_linked
    }

    pub fn version(&self) -> u16 {
        self.header.version
    }

    pub fn stream_checksum(&self) -> u32 {
        self.header.stream_checksum
    }

    pub fn all_types_hash(&self) -> u32 {
        self.header.all_types_hash
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Name of the manifest this package is patched by.
    pub fn patch_manifest(&self) -> Option<&str> {
        self.external.patch.as_deref()
    }

    /// Names of the plain external manifests this package depends on.
    pub fn external_manifests(&self) -> &[String] {
        &self.external.external
    }
}

impl fmt::Display for ManifestStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.manifest_path().display())
    }
}

impl AssetSource for ManifestStore {
    fn label(&self) -> String {
        self.to_string()
    }

    fn all_types_hash(&self) -> u32 {
        self.header.all_types_hash
    }

    fn assets(&self) -> &[Asset] {
        &self.assets
    }

    fn chunk(&self, asset: &Asset) -> Result<Chunk, ManifestError> {
        ManifestStore::chunk(self, asset)
    }

    fn content_data(&self, asset: &Asset) -> Result<Option<Vec<u8>>, ManifestError> {
        ManifestStore::content_data(self, asset)
    }
}
