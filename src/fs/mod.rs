// src/fs/mod.rs

use std::fmt::Debug;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

pub mod mock;

/// Abstract filesystem interface.
///
/// The checkpoint sweep, archive and dataset preflight only touch the disk
/// through this trait, so they can be exercised against [`mock::MockFileSystem`].
pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>>;
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn file_len(&self, path: &Path) -> Result<u64>;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Copy `src` to `dst` unless `dst` already exists.
    ///
    /// Returns `Ok(false)` without touching anything if `dst` is present.
    /// A half-written `dst` is never observable.
    fn publish_copy(&self, src: &Path, dst: &Path) -> Result<bool>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let file = fs::File::open(path).with_context(|| format!("opening file {:?}", path))?;
        Ok(Box::new(file))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        let mut file = fs::File::create(path).with_context(|| format!("creating file {:?}", path))?;
        file.write_all(contents).with_context(|| format!("writing to file {:?}", path))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn file_len(&self, path: &Path) -> Result<u64> {
        let meta = fs::metadata(path).with_context(|| format!("stat {:?}", path))?;
        Ok(meta.len())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        Ok(entries)
    }

    fn publish_copy(&self, src: &Path, dst: &Path) -> Result<bool> {
        publish_via(
            src,
            dst,
            |from, to| fs::copy(from, to).map(|_| ()),
            |from, to| fs::hard_link(from, to),
        )
    }
}

/// No-clobber publish of `src` at `dst` with pluggable copy and link steps.
///
/// `copy` writes a hidden partial sibling of `dst`, `link` moves it into
/// place and must fail with `AlreadyExists` if `dst` is present. Where
/// links are unsupported the partial file is copied into a newly created
/// `dst` instead. The partial file is removed on every path.
pub fn publish_via<C, L>(src: &Path, dst: &Path, copy: C, link: L) -> Result<bool>
where
    C: FnOnce(&Path, &Path) -> io::Result<()>,
    L: FnOnce(&Path, &Path) -> io::Result<()>,
{
    if dst.exists() {
        return Ok(false);
    }
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
    }

    let partial = partial_path(dst);
    if let Err(e) = copy(src, &partial) {
        let _ = fs::remove_file(&partial);
        return Err(e).with_context(|| format!("copying {:?} to {:?}", src, partial));
    }

    let published = match link(&partial, dst) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) if matches!(e.kind(), io::ErrorKind::Unsupported | io::ErrorKind::PermissionDenied) => {
            debug!(dst = ?dst, error = %e, "hard link unavailable; copying into a new file");
            copy_new(&partial, dst)
        }
        Err(e) => Err(e).with_context(|| format!("publishing {:?}", dst)),
    };
    let _ = fs::remove_file(&partial);
    published
}

/// Copy `from` into `to`, which must not exist yet.
fn copy_new(from: &Path, to: &Path) -> Result<bool> {
    let mut out = match OpenOptions::new().write(true).create_new(true).open(to) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e).with_context(|| format!("creating {:?}", to)),
    };
    let mut input = fs::File::open(from).with_context(|| format!("opening {:?}", from))?;
    if let Err(e) = io::copy(&mut input, &mut out) {
        drop(out);
        let _ = fs::remove_file(to);
        return Err(e).with_context(|| format!("copying {:?} to {:?}", from, to));
    }
    Ok(true)
}

/// Hidden sibling used as the copy target before a file is published.
fn partial_path(dst: &Path) -> PathBuf {
    let name = dst
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dst.with_file_name(format!(".{name}.partial"))
}
