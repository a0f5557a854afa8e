use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use crate::{
    error::{RainfallError, Result},
    io::write_atomically,
    traits::BlobStore,
};

/// Identifier returned by a store for a written blob
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobId(pub String);

impl std::fmt::Display for BlobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Blob store backed by a directory, one file per key
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && !key.contains(['/', '\\'])
            && key != "..";
        if !valid {
            return Err(RainfallError::archival(key, "key must be a plain file name"));
        }
        Ok(self.root.join(key))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, bytes: &[u8], key: &str) -> Result<BlobId> {
        let path = self.path_for(key)?;
        write_atomically(&path, bytes).map_err(|e| RainfallError::archival(key, e))?;
        Ok(BlobId(format!("fs:{}", key)))
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key)?.is_file())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(RainfallError::BlobNotFound(key.to_string())),
            Err(e) => Err(RainfallError::archival(key, e)),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RainfallError::archival(&self.root.display().to_string(), e)),
        };
        let mut keys: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| !name.starts_with('.'))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// In-process blob store
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
    puts: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `put` calls so far
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, bytes: &[u8], key: &str) -> Result<BlobId> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| RainfallError::archival(key, "store lock poisoned"))?;
        blobs.insert(key.to_string(), bytes.to_vec());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(BlobId(format!("mem:{}", key)))
    }

    fn exists(&self, key: &str) -> Result<bool> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| RainfallError::archival(key, "store lock poisoned"))?;
        Ok(blobs.contains_key(key))
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| RainfallError::archival(key, "store lock poisoned"))?;
        blobs
            .get(key)
            .cloned()
            .ok_or_else(|| RainfallError::BlobNotFound(key.to_string()))
    }

    fn keys(&self) -> Result<Vec<String>> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| RainfallError::Archival("store lock poisoned".to_string()))?;
        Ok(blobs.keys().cloned().collect())
    }
}
