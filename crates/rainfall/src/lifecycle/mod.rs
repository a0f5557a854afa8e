//! The single "current artifact" slot.
//!
//! A slot is a directory that holds exactly one artifact file after every
//! completed `install`. A superseded artifact is copied into the blob store
//! under its file name before it is removed, so it is never lost; a failed
//! `install` leaves the slot as it found it.
//!
//! Installs hold an advisory lock on `<slot>/.lock`, so managers in other
//! processes (or other managers in this one) pointed at the same slot take
//! turns.

pub mod blob_store;

pub use blob_store::{BlobId, FsBlobStore, MemoryBlobStore};

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fd_lock::RwLock;
use tracing::{debug, info, warn};
use crate::{
    config::ArtifactConfig,
    error::{RainfallError, Result},
    io::move_file,
    traits::BlobStore,
};

const LOCK_FILE: &str = ".lock";

/// Serialises replace-and-archive transitions of one artifact slot
pub struct ArtifactLifecycleManager {
    slot_dir: PathBuf,
    extension: String,
    blob_store: Arc<dyn BlobStore>,
    lock: Mutex<()>,
}

impl ArtifactLifecycleManager {
    pub fn new(slot_dir: impl Into<PathBuf>, blob_store: Arc<dyn BlobStore>) -> Self {
        Self {
            slot_dir: slot_dir.into(),
            extension: ArtifactConfig::default().extension,
            blob_store,
            lock: Mutex::new(()),
        }
    }

    /// Slot at `current_dir`, archiving into a filesystem store at `archive_dir`
    pub fn from_config(artifacts: &ArtifactConfig) -> Self {
        let store = Arc::new(FsBlobStore::new(&artifacts.archive_dir));
        Self::new(&artifacts.current_dir, store).with_extension(&artifacts.extension)
    }

    /// Only files with this extension count as artifacts in the slot
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn slot_dir(&self) -> &Path {
        &self.slot_dir
    }

    pub fn blob_store(&self) -> &Arc<dyn BlobStore> {
        &self.blob_store
    }

    /// The current artifact, if the slot holds one
    pub fn current(&self) -> Result<Option<PathBuf>> {
        Ok(self.current_artifacts()?.into_iter().next())
    }

    /// Bytes of an archived artifact
    pub fn archived(&self, key: &str) -> Result<Vec<u8>> {
        self.blob_store.get(key)
    }

    /// Replace the current artifact with `new_artifact` and return its
    /// installed path.
    ///
    /// Fails with `Archival` before touching the slot if a current artifact
    /// cannot be archived; the new artifact then stays where it was.
    pub fn install(&self, new_artifact: &Path) -> Result<PathBuf> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| RainfallError::Persistence("artifact slot lock poisoned".to_string()))?;

        let file_name = new_artifact
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| RainfallError::persistence(new_artifact, "artifact has no file name"))?;
        if !new_artifact.is_file() {
            return Err(RainfallError::persistence(new_artifact, "artifact does not exist"));
        }
        fs::create_dir_all(&self.slot_dir).map_err(|e| RainfallError::persistence(&self.slot_dir, e))?;

        let lock_path = self.slot_dir.join(LOCK_FILE);
        let lock_file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| RainfallError::persistence(&lock_path, e))?;
        let mut slot_lock = RwLock::new(lock_file);
        let _slot_guard = slot_lock
            .write()
            .map_err(|e| RainfallError::persistence(&lock_path, e))?;

        let current = self.current_artifacts()?;

        // Archive before anything in the slot changes
        for path in &current {
            self.archive(path)?;
        }

        // Stage next to the final path so the last step is a same-directory rename
        let staged = self.slot_dir.join(format!(".{}.partial", file_name));
        move_file(new_artifact, &staged).map_err(|e| RainfallError::persistence(&staged, e))?;

        // Superseded artifacts are set aside, not deleted, until the new one is in place
        let mut set_aside = Vec::new();
        for path in &current {
            let aside = aside_path(path);
            match fs::rename(path, &aside) {
                Ok(()) => set_aside.push((path.clone(), aside)),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(artifact = %path.display(), "artifact already gone");
                }
                Err(e) => {
                    self.roll_back(&set_aside, &staged, new_artifact);
                    return Err(RainfallError::persistence(path, e));
                }
            }
        }

        let final_path = self.slot_dir.join(&file_name);
        if let Err(e) = fs::rename(&staged, &final_path) {
            self.roll_back(&set_aside, &staged, new_artifact);
            return Err(RainfallError::persistence(&final_path, e));
        }

        for (_, aside) in &set_aside {
            if let Err(e) = fs::remove_file(aside) {
                warn!(artifact = %aside.display(), error = %e, "failed to delete superseded artifact");
            }
        }

        info!(
            artifact = %final_path.display(),
            superseded = set_aside.len(),
            "artifact installed"
        );
        Ok(final_path)
    }

    fn archive(&self, path: &Path) -> Result<()> {
        let key = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| RainfallError::archival(&path.display().to_string(), "artifact has no file name"))?;

        if self.blob_store.exists(key).map_err(|e| as_archival(key, e))? {
            debug!(key, "artifact already archived");
            return Ok(());
        }

        let bytes = fs::read(path).map_err(|e| RainfallError::archival(key, e))?;
        let id = self.blob_store.put(&bytes, key).map_err(|e| as_archival(key, e))?;
        info!(key, blob = %id, "artifact archived");
        Ok(())
    }

    /// Best effort: move set-aside artifacts back under their names and put
    /// the staged artifact back where the caller left it.
    fn roll_back(&self, set_aside: &[(PathBuf, PathBuf)], staged: &Path, original: &Path) {
        for (path, aside) in set_aside {
            if let Err(e) = fs::rename(aside, path) {
                warn!(artifact = %path.display(), error = %e, "failed to restore artifact");
            }
        }
        if let Err(e) = move_file(staged, original) {
            warn!(artifact = %original.display(), error = %e, "failed to return staged artifact");
        }
    }

    fn current_artifacts(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.slot_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RainfallError::persistence(&self.slot_dir, e)),
        };

        let mut artifacts: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                let visible = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !n.starts_with('.'));
                visible && path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str())
            })
            .collect();
        artifacts.sort();
        Ok(artifacts)
    }
}

/// Hidden sibling a superseded artifact waits in during an install
fn aside_path(path: &Path) -> PathBuf {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("artifact");
    path.with_file_name(format!(".{}.superseded", name))
}

fn as_archival(key: &str, err: RainfallError) -> RainfallError {
    match err {
        RainfallError::Archival(_) => err,
        other => RainfallError::archival(key, other),
    }
}
