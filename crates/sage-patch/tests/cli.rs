//! Exit statuses of the `extract-patch` binary.
//!
//! `-1`, `-2` and `-3` reach the shell as their low byte: 255, 254 and 253.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use sage_manifest::package::{PackageAsset, PackageBuilder};

fn extract_patch(args: &[&Path]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_extract-patch"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("spawn extract-patch")
}

fn write_map(root: &Path, dir: &str, checksum: u32) {
    PackageBuilder::new(checksum)
        .asset(PackageAsset::new(0x20, 1, "Texture:Shared").instance(vec![1, 2, 3]))
        .write(&root.join(dir), "map")
        .unwrap();
}

#[test]
fn valid_root_exits_zero() {
    let root = tempfile::tempdir().unwrap();
    write_map(root.path(), "a", 1);
    write_map(root.path(), "b", 2);
    let report = root.path().join("report.json");

    let out = Command::new(env!("CARGO_BIN_EXE_extract-patch"))
        .arg(root.path())
        .arg("--report")
        .arg(&report)
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stdout));
    assert!(root.path().join("patch.manifest").is_file());
    let json: serde_json::Value = serde_json::from_slice(&fs::read(report).unwrap()).unwrap();
    assert_eq!(json["outcome"]["outcome"], "written");
    assert_eq!(json["outcome"]["asset_count"], 1);
}

#[test]
fn missing_argument_exits_255() {
    assert_eq!(extract_patch(&[]).status.code(), Some(255));
}

#[test]
fn missing_root_exits_254() {
    let root = tempfile::tempdir().unwrap();
    let out = extract_patch(&[&root.path().join("nowhere")]);
    assert_eq!(out.status.code(), Some(254));
}

#[test]
fn corrupt_stream_exits_253() {
    let root = tempfile::tempdir().unwrap();
    write_map(root.path(), "a", 1);
    write_map(root.path(), "b", 2);
    fs::write(root.path().join("b/map.imp"), [0u8; 4]).unwrap();

    let out = extract_patch(&[root.path()]);
    assert_eq!(out.status.code(), Some(253));
    assert!(String::from_utf8_lossy(&out.stdout).contains("checksum mismatch"));
    assert!(!root.path().join("patch.manifest").exists());
}
