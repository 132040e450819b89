// tests/archive.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::path::{Path, PathBuf};

use trainwatch::checkpoint::{archive, compute_file_hash, final_sweep, SweepPlan, ARCHIVE_MANIFEST};
use trainwatch::fs::mock::MockFileSystem;
use trainwatch::fs::FileSystem;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn hashes_with_blake3() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("test.txt", b"hello world");

    let hash = compute_file_hash(&fs, Path::new("test.txt"))?;
    assert_eq!(hash, "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24");
    Ok(())
}

#[test]
fn archive_collects_published_checkpoints_with_manifest() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let plan = SweepPlan::new("output", "mylora", "adapter_model.safetensors");
    fs.add_file("output/run1/epoch1/adapter_model.safetensors", b"hello world");
    fs.add_file("output/run1/epoch10/adapter_model.safetensors", b"epoch ten");
    fs.add_file("output/run1/epoch2/adapter_model.safetensors", b"epoch two");
    fs.add_file("output/other_1.safetensors", b"different run");

    assert_eq!(final_sweep(&fs, &plan)?.len(), 3);
    let dir = archive(&fs, &plan)?;

    assert_eq!(dir, PathBuf::from("output/mylora_checkpoints"));
    assert_eq!(
        fs.contents("output/mylora_checkpoints/mylora_10.safetensors"),
        Some(b"epoch ten".to_vec())
    );
    assert!(!fs.exists(Path::new("output/mylora_checkpoints/other_1.safetensors")));

    let manifest: toml::Table = toml::from_str(&fs.read_to_string(&dir.join(ARCHIVE_MANIFEST))?)?;
    assert_eq!(manifest["run_name"].as_str(), Some("mylora"));

    let artifacts = manifest["artifacts"].as_array().expect("artifacts array");
    let epochs: Vec<i64> = artifacts
        .iter()
        .map(|a| a["epoch"].as_integer().unwrap())
        .collect();
    assert_eq!(epochs, vec![1, 2, 10]);
    assert_eq!(artifacts[0]["file"].as_str(), Some("mylora_1.safetensors"));
    assert_eq!(artifacts[0]["bytes"].as_integer(), Some(11));
    assert_eq!(
        artifacts[0]["blake3"].as_str(),
        Some("d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24")
    );
    Ok(())
}

#[test]
fn archiving_twice_keeps_existing_copies() -> TestResult {
    let fs = MockFileSystem::new();
    let plan = SweepPlan::new("output", "mylora", "adapter_model.safetensors");
    fs.add_file("output/mylora_1.safetensors", b"one");

    archive(&fs, &plan)?;
    let copies = fs.copy_count();
    archive(&fs, &plan)?;

    assert_eq!(fs.copy_count(), copies);
    Ok(())
}

#[test]
fn archive_without_checkpoints_writes_empty_manifest() -> TestResult {
    let fs = MockFileSystem::new();
    let plan = SweepPlan::new("output", "empty", "adapter_model.safetensors");

    let dir = archive(&fs, &plan)?;
    let manifest: toml::Table = toml::from_str(&fs.read_to_string(&dir.join(ARCHIVE_MANIFEST))?)?;

    assert_eq!(manifest["run_name"].as_str(), Some("empty"));
    assert!(
        manifest
            .get("artifacts")
            .and_then(|a| a.as_array())
            .is_none_or(|a| a.is_empty())
    );
    Ok(())
}
