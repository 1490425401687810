#![cfg(feature = "cli")]

use std::process::Command;
use tempfile::tempdir;

fn bin() -> String {
    env!("CARGO_BIN_EXE_romdelta").to_string()
}

#[test]
fn cli_encode_decode_roundtrip() {
    let dir = tempdir().unwrap();
    let reference = dir.path().join("reference.rom");
    let target = dir.path().join("target.rom");
    let delta = dir.path().join("patch.delta");
    let output = dir.path().join("output.rom");

    std::fs::write(&reference, b"abcde12345abcde12345").unwrap();
    std::fs::write(&target, b"abcdeXXXXXabcde12345").unwrap();

    let st = Command::new(bin())
        .arg("--force")
        .arg("encode")
        .arg("--verify")
        .arg(&reference)
        .arg(&target)
        .arg(&delta)
        .status()
        .unwrap();
    assert!(st.success());

    let st = Command::new(bin())
        .arg("--force")
        .arg("decode")
        .arg(&reference)
        .arg(&delta)
        .arg(&output)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(
        std::fs::read(&output).unwrap(),
        std::fs::read(&target).unwrap()
    );
}

#[test]
fn cli_rejects_mismatched_image_sizes() {
    let dir = tempdir().unwrap();
    let reference = dir.path().join("reference.rom");
    let target = dir.path().join("target.rom");
    let delta = dir.path().join("patch.delta");

    std::fs::write(&reference, b"12345678").unwrap();
    std::fs::write(&target, b"1234").unwrap();

    let st = Command::new(bin())
        .arg("encode")
        .arg(&reference)
        .arg(&target)
        .arg(&delta)
        .status()
        .unwrap();
    assert!(!st.success());
}

#[test]
fn cli_refuses_to_overwrite_without_force() {
    let dir = tempdir().unwrap();
    let reference = dir.path().join("reference.rom");
    let target = dir.path().join("target.rom");
    let delta = dir.path().join("patch.delta");

    std::fs::write(&reference, b"12345678").unwrap();
    std::fs::write(&target, b"12345679").unwrap();
    std::fs::write(&delta, b"existing").unwrap();

    let st = Command::new(bin())
        .arg("encode")
        .arg(&reference)
        .arg(&target)
        .arg(&delta)
        .status()
        .unwrap();
    assert!(!st.success());
    assert_eq!(std::fs::read(&delta).unwrap(), b"existing");
}

#[test]
fn cli_tokens_listing() {
    let dir = tempdir().unwrap();
    let reference = dir.path().join("reference.rom");
    let target = dir.path().join("target.rom");
    let delta = dir.path().join("patch.delta");

    std::fs::write(&reference, b"firmware image 0001").unwrap();
    std::fs::write(&target, b"firmware image 0002").unwrap();

    let st = Command::new(bin())
        .arg("encode")
        .arg(&reference)
        .arg(&target)
        .arg(&delta)
        .status()
        .unwrap();
    assert!(st.success());

    let out = Command::new(bin()).arg("tokens").arg(&delta).output().unwrap();
    assert!(out.status.success());
    let listing = String::from_utf8_lossy(&out.stdout);
    assert!(listing.contains("Kind"), "listing: {listing}");
}

#[test]
fn cli_decode_failure_on_garbage_stream() {
    let dir = tempdir().unwrap();
    let reference = dir.path().join("reference.rom");
    let delta = dir.path().join("patch.delta");
    let output = dir.path().join("output.rom");

    std::fs::write(&reference, b"12345678").unwrap();
    // A lone literal tag with no payload is a truncated stream.
    std::fs::write(&delta, [0x00u8]).unwrap();

    let st = Command::new(bin())
        .arg("decode")
        .arg(&reference)
        .arg(&delta)
        .arg(&output)
        .status()
        .unwrap();
    assert!(!st.success());
}

#[test]
fn cli_json_stats() {
    let dir = tempdir().unwrap();
    let reference = dir.path().join("reference.rom");
    let target = dir.path().join("target.rom");
    let delta = dir.path().join("patch.delta");

    std::fs::write(&reference, b"0123456789abcdef").unwrap();
    std::fs::write(&target, b"0123456789abcdeg").unwrap();

    let out = Command::new(bin())
        .arg("--json")
        .arg("encode")
        .arg(&reference)
        .arg(&target)
        .arg(&delta)
        .output()
        .unwrap();
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("\"command\": \"encode\""), "stderr: {stderr}");
}

#[test]
fn cli_config_works() {
    let out = Command::new(bin()).arg("config").output().unwrap();
    assert!(out.status.success());
}
