//! Sage Manifest -- binary asset manifest packages of the map pipeline.
//!
//! A map's assets are described by one *manifest package*: a `.manifest` file
//! holding a fixed header, a table of asset entries and four variable-length
//! buffers, plus three side-band streams carrying the raw chunk data of every
//! asset. This crate decodes and encodes that format and gives random access
//! to an asset's chunks.
//!
//! # Modules
//!
//! - [`layout`]: fixed-size records ([`ManifestHeader`](layout::ManifestHeader),
//!   [`AssetEntry`](layout::AssetEntry), [`AssetHeader`](layout::AssetHeader))
//!   and byte order handling.
//! - [`buffers`]: name, reference and external-manifest buffers.
//! - [`image`]: whole-manifest decode/encode with size validation.
//! - [`hash`]: the 32-bit hash behind type ids and content fingerprints.
//! - [`asset`]: resolved [`Asset`](asset::Asset)s, identities and chunks.
//! - [`store`]: [`ManifestStore`](store::ManifestStore), an opened linked
//!   package, and the [`AssetSource`](store::AssetSource) trait.
//! - [`package`]: writes linked packages to disk (map fixtures).

#![deny(unsafe_code)]

use std::path::PathBuf;

pub mod asset;
pub mod buffers;
pub mod hash;
pub mod image;
pub mod layout;
pub mod package;
pub mod store;

use asset::StreamKind;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors raised while reading or encoding manifest packages.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The package is valid but of a kind this crate does not handle.
    #[error("unsupported manifest format: {reason}")]
    UnsupportedFormat { reason: String },

    /// Declared sizes or offsets disagree with the bytes on disk.
    #[error("corrupt manifest: {details}")]
    Corrupt { details: String },

    /// A side-band stream does not start with the manifest's checksum.
    #[error(
        "checksum mismatch with {stream} data: manifest has {expected:#010x}, stream has {found:#010x}"
    )]
    ChecksumMismatch {
        stream: StreamKind,
        expected: u32,
        found: u32,
    },

    /// A side-band stream ends before a declared chunk does.
    #[error(
        "{stream} stream truncated at offset {offset}: expected {expected} bytes, read {actual}"
    )]
    TruncatedStream {
        stream: StreamKind,
        offset: u64,
        expected: u32,
        actual: u32,
    },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::asset::{Asset, AssetId, AssetReference, Chunk, StreamKind};
    pub use crate::buffers::ExternalManifests;
    pub use crate::hash::{fast_hash, type_id_of};
    pub use crate::image::ManifestImage;
    pub use crate::layout::{AssetEntry, AssetHeader, ByteOrder, ManifestHeader};
    pub use crate::store::{AssetSource, ManifestStore};
    pub use crate::ManifestError;
}
