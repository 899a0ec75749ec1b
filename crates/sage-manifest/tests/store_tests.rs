//! Integration tests for opening linked packages from disk.
//!
//! Fixtures are written with [`PackageBuilder`] into temporary directories,
//! then read back through [`ManifestStore`].

use std::fs;
use std::path::PathBuf;

use sage_manifest::package::{PackageAsset, PackageBuilder};
use sage_manifest::prelude::*;

const CHECKSUM: u32 = 0x5EED_1234;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn three_assets() -> PackageBuilder {
    PackageBuilder::new(CHECKSUM)
        .all_types_hash(0xA11_7E5)
        .asset(
            PackageAsset::new(10, 1, "Texture:Grass")
                .hashes(0x100, 0x200)
                .source("art/grass.xml")
                .instance(vec![1, 2, 3, 4])
                .relocation(vec![9, 9])
                .references(vec![AssetId::new(20, 2)]),
        )
        .asset(
            PackageAsset::new(20, 2, "Model:Tree")
                .instance(vec![5, 6])
                .imports(vec![7, 7, 7])
                .content_data(b"cdata".to_vec()),
        )
        .asset(
            PackageAsset::new(30, 3, "Audio:Wind")
                .instance(vec![8])
                .relocation(vec![1, 2, 3])
                .imports(vec![4]),
        )
        .external_manifest("global_common", false)
        .external_manifest("patch", true)
}

fn write(builder: &PackageBuilder) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = builder.write(dir.path(), "map").expect("write package");
    (dir, path)
}

// ---------------------------------------------------------------------------
// Opening
// ---------------------------------------------------------------------------

#[test]
fn open_resolves_assets_in_table_order() {
    let (_dir, path) = write(&three_assets());
    let store = ManifestStore::open(&path).unwrap();

    assert!(store.is_linked());
    assert_eq!(store.version(), 5);
    assert_eq!(store.stream_checksum(), CHECKSUM);
    assert_eq!(store.all_types_hash(), 0xA11_7E5);
    assert_eq!(store.asset_count(), 3);

    let names: Vec<_> = store.assets().iter().map(|a| a.qualified_name.as_str()).collect();
    assert_eq!(names, ["Texture:Grass", "Model:Tree", "Audio:Wind"]);

    let grass = &store.assets()[0];
    assert_eq!(grass.source, "art/grass.xml");
    assert_eq!((grass.type_hash, grass.instance_hash), (0x100, 0x200));
    assert_eq!(grass.references, vec![AssetId::new(20, 2)]);
    assert_eq!(store.to_string(), path.display().to_string());
}

#[test]
fn stream_offsets_accumulate_from_four() {
    let (_dir, path) = write(&three_assets());
    let store = ManifestStore::open(&path).unwrap();
    let offsets: Vec<_> = store
        .assets()
        .iter()
        .map(|a| (a.instance_offset, a.relocation_offset, a.imports_offset))
        .collect();
    assert_eq!(offsets, vec![(4, 4, 4), (8, 6, 4), (10, 6, 7)]);
}

#[test]
fn external_manifest_names_are_split() {
    let (_dir, path) = write(&three_assets());
    let store = ManifestStore::open(&path).unwrap();
    assert_eq!(store.patch_manifest(), Some("patch"));
    assert_eq!(store.external_manifests(), ["global_common".to_owned()]);
}

#[test]
fn big_endian_package_opens() {
    let builder = three_assets().byte_order(ByteOrder::Big);
    let (_dir, path) = write(&builder);
    let store = ManifestStore::open(&path).unwrap();
    assert_eq!(store.byte_order(), ByteOrder::Big);
    assert_eq!(store.stream_checksum(), CHECKSUM);
    assert_eq!(store.assets()[0].references, vec![AssetId::new(20, 2)]);
    assert_eq!(store.chunk(&store.assets()[2]).unwrap().relocation, vec![1, 2, 3]);
}

// ---------------------------------------------------------------------------
// Chunks and content data
// ---------------------------------------------------------------------------

#[test]
fn chunk_reads_exact_slices() {
    let (_dir, path) = write(&three_assets());
    let store = ManifestStore::open(&path).unwrap();

    let tree = store.chunk(&store.assets()[1]).unwrap();
    assert_eq!(tree.instance, vec![5, 6]);
    assert!(tree.relocation.is_empty());
    assert_eq!(tree.imports, vec![7, 7, 7]);

    let wind = store.chunk(&store.assets()[2]).unwrap();
    assert_eq!(wind.buffer(StreamKind::Instance), &[8]);
    assert_eq!(wind.buffer(StreamKind::Relocation), &[1, 2, 3]);
    assert_eq!(wind.buffer(StreamKind::Imports), &[4]);
}

#[test]
fn content_data_is_optional() {
    let (_dir, path) = write(&three_assets());
    let store = ManifestStore::open(&path).unwrap();
    assert_eq!(store.content_data(&store.assets()[0]).unwrap(), None);
    assert_eq!(
        store.content_data(&store.assets()[1]).unwrap(),
        Some(b"cdata".to_vec())
    );
}

#[test]
fn truncated_stream_is_reported() {
    let (dir, path) = write(&three_assets());
    let store = ManifestStore::open(&path).unwrap();

    // Drop the last byte of the relocation stream, which belongs to Audio:Wind.
    let relo = dir.path().join("map.relo");
    let mut bytes = fs::read(&relo).unwrap();
    bytes.pop();
    fs::write(&relo, bytes).unwrap();

    let err = store.chunk(&store.assets()[2]).unwrap_err();
    match err {
        ManifestError::TruncatedStream {
            stream,
            offset,
            expected,
            actual,
        } => {
            assert_eq!(stream, StreamKind::Relocation);
            assert_eq!(offset, 6);
            assert_eq!(expected, 3);
            assert_eq!(actual, 2);
        }
        other => panic!("expected TruncatedStream, got {other:?}"),
    }
    // Earlier assets are unaffected.
    assert!(store.chunk(&store.assets()[0]).is_ok());
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

#[test]
fn short_checksum_prefix_reports_bytes_present() {
    let (dir, path) = write(&three_assets());
    fs::write(dir.path().join("map.relo"), [0xAB, 0xCD]).unwrap();

    let err = ManifestStore::open(&path).unwrap_err();
    match err {
        ManifestError::TruncatedStream {
            stream,
            offset,
            expected,
            actual,
        } => {
            assert_eq!(stream, StreamKind::Relocation);
            assert_eq!((offset, expected, actual), (0, 4, 2));
        }
        other => panic!("expected TruncatedStream, got {other:?}"),
    }
}

#[test]
fn checksum_mismatch_names_the_stream() {
    let (dir, path) = write(&three_assets());
    let imp = dir.path().join("map.imp");
    let mut bytes = fs::read(&imp).unwrap();
    bytes[0] ^= 0xFF;
    fs::write(&imp, bytes).unwrap();

    let err = ManifestStore::open(&path).unwrap_err();
    assert!(
        matches!(
            err,
            ManifestError::ChecksumMismatch {
                stream: StreamKind::Imports,
                expected: CHECKSUM,
                ..
            }
        ),
        "{err}"
    );
    assert!(err.to_string().contains("imports"));
}

#[test]
fn unlinked_manifest_is_unsupported() {
    let (_dir, path) = write(&three_assets());
    let mut image = ManifestImage::decode(&fs::read(&path).unwrap()).unwrap();
    image.header.is_linked = false;
    fs::write(&path, image.encode()).unwrap();

    let err = ManifestStore::open(&path).unwrap_err();
    assert!(matches!(err, ManifestError::UnsupportedFormat { .. }), "{err}");
}

#[test]
fn buffer_size_mismatch_is_corrupt() {
    let (_dir, path) = write(&three_assets());
    let mut bytes = fs::read(&path).unwrap();
    bytes.extend_from_slice(&[0, 0]);
    fs::write(&path, bytes).unwrap();

    let err = ManifestStore::open(&path).unwrap_err();
    assert!(matches!(err, ManifestError::Corrupt { .. }), "{err}");
}

#[test]
fn missing_stream_is_io_error() {
    let (dir, path) = write(&three_assets());
    fs::remove_file(dir.path().join("map.bin")).unwrap();

    let err = ManifestStore::open(&path).unwrap_err();
    match err {
        ManifestError::Io { path, .. } => assert!(path.ends_with("map.bin")),
        other => panic!("expected Io, got {other:?}"),
    }
}

#[test]
fn empty_package_opens() {
    let (_dir, path) = write(&PackageBuilder::new(CHECKSUM));
    let store = ManifestStore::open(&path).unwrap();
    assert_eq!(store.asset_count(), 0);
    assert_eq!(store.patch_manifest(), None);
    assert!(store.external_manifests().is_empty());
}

#[test]
fn latin1_names_open_unchanged() {
    let builder = PackageBuilder::new(CHECKSUM).asset(
        PackageAsset::new(10, 1, "Texture:Caf\u{C9}")
            .source("art/caf\u{C9}.tga")
            .instance(vec![1]),
    );
    let (_dir, path) = write(&builder);

    let raw = fs::read(&path).unwrap();
    assert!(raw.windows(5).any(|w| w == b"caf\xC9."));

    let store = ManifestStore::open(&path).unwrap();
    assert_eq!(store.assets()[0].qualified_name, "Texture:Caf\u{C9}");
    assert_eq!(store.assets()[0].source, "art/caf\u{C9}.tga");
}
