// tests/fs_publish.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::io;
use std::path::Path;

use tempfile::tempdir;

use trainwatch::fs::{publish_via, FileSystem, RealFileSystem};

type TestResult = Result<(), Box<dyn Error>>;

fn partial_files(dir: &Path) -> io::Result<Vec<String>> {
    Ok(std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".partial"))
        .collect())
}

#[test]
fn failed_copy_leaves_no_partial_file() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let src = dir.path().join("adapter_model.safetensors");
    std::fs::write(&src, b"weights")?;
    let dst = dir.path().join("mylora_1.safetensors");

    // Half the bytes land, then the disk fills up.
    let res = publish_via(
        &src,
        &dst,
        |_, partial| {
            std::fs::write(partial, b"wei")?;
            Err(io::Error::other("No space left on device"))
        },
        |from, to| std::fs::hard_link(from, to),
    );

    assert!(res.is_err());
    assert!(!dst.exists());
    assert!(partial_files(dir.path())?.is_empty());
    Ok(())
}

#[test]
fn unsupported_links_fall_back_to_a_fresh_copy() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let src = dir.path().join("adapter_model.safetensors");
    std::fs::write(&src, b"weights")?;
    let dst = dir.path().join("mylora_1.safetensors");

    let no_links = |_: &Path, _: &Path| -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "no hard links here"))
    };
    let copy = |from: &Path, to: &Path| std::fs::copy(from, to).map(|_| ());

    assert!(publish_via(&src, &dst, copy, no_links)?);
    assert_eq!(std::fs::read(&dst)?, b"weights");
    assert!(partial_files(dir.path())?.is_empty());

    // Still no clobbering on the fallback path.
    std::fs::write(&src, b"changed")?;
    assert!(!publish_via(&src, &dst, copy, no_links)?);
    assert_eq!(std::fs::read(&dst)?, b"weights");
    Ok(())
}

#[test]
fn destination_appearing_mid_publish_is_kept() -> TestResult {
    let dir = tempdir()?;
    let src = dir.path().join("adapter_model.safetensors");
    std::fs::write(&src, b"mine")?;
    let dst = dir.path().join("mylora_2.safetensors");

    // Another sweep wins the race between our existence check and the link.
    let published = publish_via(
        &src,
        &dst,
        |from, to| std::fs::copy(from, to).map(|_| ()),
        |from, to| {
            std::fs::write(to, b"theirs")?;
            std::fs::hard_link(from, to)
        },
    )?;

    assert!(!published);
    assert_eq!(std::fs::read(&dst)?, b"theirs");
    assert!(partial_files(dir.path())?.is_empty());
    Ok(())
}

#[test]
fn missing_source_is_an_error_without_leftovers() -> TestResult {
    let dir = tempdir()?;
    let dst = dir.path().join("mylora_3.safetensors");

    assert!(RealFileSystem.publish_copy(&dir.path().join("gone"), &dst).is_err());
    assert!(!dst.exists());
    assert!(partial_files(dir.path())?.is_empty());
    Ok(())
}
