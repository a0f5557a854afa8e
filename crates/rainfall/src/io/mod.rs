pub mod geojson;
pub mod kml;

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{RainfallError, Result};

static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write `bytes` to `path` so that readers see either the old file or the
/// complete new one: temp file in the same directory, fsync, rename.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir).map_err(|e| RainfallError::persistence(dir, e))?;

    let mut file = tempfile::Builder::new()
        .prefix(".tmp-")
        .tempfile_in(dir)
        .map_err(|e| RainfallError::persistence(dir, e))?;
    file.write_all(bytes).map_err(|e| RainfallError::persistence(path, e))?;
    file.as_file().sync_all().map_err(|e| RainfallError::persistence(path, e))?;
    file.persist(path).map_err(|e| RainfallError::persistence(path, e.error))?;
    Ok(())
}

/// Rename `from` to `to`, falling back to copy + delete across filesystems.
/// On failure `from` is left in place.
pub fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    if let Err(e) = fs::copy(from, to) {
        let _ = fs::remove_file(to);
        return Err(e);
    }
    fs::remove_file(from)
}

/// Create a fresh run-scoped directory under `staging_root`.
pub fn run_directory(staging_root: &Path) -> Result<PathBuf> {
    fs::create_dir_all(staging_root).map_err(|e| RainfallError::persistence(staging_root, e))?;
    loop {
        let n = RUN_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = staging_root.join(format!("run-{}-{}", std::process::id(), n));
        match fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(RainfallError::persistence(&dir, e)),
        }
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}
