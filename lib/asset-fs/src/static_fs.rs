use std::collections::HashMap;
use std::path::Path;
use std::time::SystemTime;

use bytes::Bytes;

use crate::path::{normalize, split};
use crate::{AssetFile, AssetSource, FileSystem, FsError, Metadata, Result};

#[derive(Debug, Clone)]
struct AssetEntry {
    data: Bytes,
    metadata: Metadata,
}

/// An immutable, in-memory file system built from an [`AssetSource`].
///
/// Keys are normalized absolute paths. Besides one entry per asset, every
/// directory holding an `index.html` gets an empty directory entry so that
/// directory requests can be resolved to their index.
#[derive(Debug, Clone, Default)]
pub struct AssetFileSystem {
    entries: HashMap<String, AssetEntry>,
}

impl AssetFileSystem {
    /// Load every asset from `source`.
    ///
    /// The first metadata or data lookup that fails aborts the whole build,
    /// there is no partially populated file system.
    pub fn new<S: AssetSource + ?Sized>(source: &S) -> Result<Self> {
        let now = SystemTime::now();
        let mut entries = HashMap::new();

        for name in source.names() {
            let metadata = source.metadata(&name).map_err(|e| {
                tracing::warn!(%name, error = %e, "Unable to read the asset's metadata");
                e
            })?;
            let data = source.data(&name).map_err(|e| {
                tracing::warn!(%name, error = %e, "Unable to read the asset's data");
                e
            })?;

            let (dir, file) = split(&name);
            if file == "index.html" {
                entries.insert(
                    normalize(dir),
                    AssetEntry {
                        data: Bytes::new(),
                        metadata: Metadata::dir(now),
                    },
                );
            }

            entries.insert(normalize(&name), AssetEntry { data, metadata });
        }

        tracing::debug!(entries = entries.len(), "Built the asset file system");

        Ok(AssetFileSystem { entries })
    }

    /// Open the entry stored at exactly `path`.
    pub fn open(&self, path: &str) -> Result<AssetFile> {
        let entry = self.entries.get(path).ok_or(FsError::EntryNotFound)?;
        Ok(AssetFile::new(
            path.to_string(),
            entry.data.clone(),
            entry.metadata,
        ))
    }

    pub fn metadata(&self, path: &str) -> Result<Metadata> {
        self.entries
            .get(path)
            .map(|entry| entry.metadata)
            .ok_or(FsError::EntryNotFound)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Every path in the file system, sorted.
    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.entries.keys().cloned().collect();
        files.sort();
        files
    }

    /// The size of the payload stored at `path`, or `0` if there is nothing
    /// there.
    pub fn len(&self, path: &str) -> u64 {
        self.entries
            .get(path)
            .map(|entry| entry.data.len() as u64)
            .unwrap_or(0)
    }

    /// The number of entries, including synthetic directories.
    pub fn entries(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FileSystem for AssetFileSystem {
    fn metadata(&self, path: &Path) -> Result<Metadata> {
        let path = path.to_str().ok_or(FsError::InvalidInput)?;
        AssetFileSystem::metadata(self, path)
    }

    fn open(&self, path: &Path) -> Result<AssetFile> {
        let path = path.to_str().ok_or(FsError::InvalidInput)?;
        AssetFileSystem::open(self, path)
    }
}
