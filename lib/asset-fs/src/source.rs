use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;

use crate::{FsError, Metadata, Result};

/// Somewhere an [`crate::AssetFileSystem`] can load its files from.
///
/// Names are slash-separated and may or may not start with `/`. Asking for
/// the metadata or data of a name that [`AssetSource::names()`] didn't return
/// should fail with [`FsError::EntryNotFound`].
pub trait AssetSource {
    /// Every name this source can provide.
    fn names(&self) -> Vec<String>;

    fn metadata(&self, name: &str) -> Result<Metadata>;

    fn data(&self, name: &str) -> Result<Bytes>;
}

impl<S: AssetSource + ?Sized> AssetSource for &S {
    fn names(&self) -> Vec<String> {
        (**self).names()
    }
    fn metadata(&self, name: &str) -> Result<Metadata> {
        (**self).metadata(name)
    }
    fn data(&self, name: &str) -> Result<Bytes> {
        (**self).data(name)
    }
}

impl<S: AssetSource + ?Sized> AssetSource for Box<S> {
    fn names(&self) -> Vec<String> {
        (**self).names()
    }
    fn metadata(&self, name: &str) -> Result<Metadata> {
        (**self).metadata(name)
    }
    fn data(&self, name: &str) -> Result<Bytes> {
        (**self).data(name)
    }
}

impl<S: AssetSource + ?Sized> AssetSource for Arc<S> {
    fn names(&self) -> Vec<String> {
        (**self).names()
    }
    fn metadata(&self, name: &str) -> Result<Metadata> {
        (**self).metadata(name)
    }
    fn data(&self, name: &str) -> Result<Bytes> {
        (**self).data(name)
    }
}

/// A single file compiled into the binary.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedAsset {
    pub name: &'static str,
    pub data: &'static [u8],
    /// Modification time in seconds since the UNIX epoch.
    pub modified: u64,
}

impl EmbeddedAsset {
    pub const fn new(name: &'static str, data: &'static [u8], modified: u64) -> Self {
        EmbeddedAsset {
            name,
            data,
            modified,
        }
    }
}

/// A table of [`EmbeddedAsset`]s, usually generated by a build script with
/// `include_bytes!()`.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedAssets(&'static [EmbeddedAsset]);

impl EmbeddedAssets {
    pub const fn new(assets: &'static [EmbeddedAsset]) -> Self {
        EmbeddedAssets(assets)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static EmbeddedAsset> {
        self.0.iter()
    }

    fn get(&self, name: &str) -> Result<&'static EmbeddedAsset> {
        self.0
            .iter()
            .find(|asset| asset.name == name)
            .ok_or(FsError::EntryNotFound)
    }
}

impl AssetSource for EmbeddedAssets {
    fn names(&self) -> Vec<String> {
        self.0.iter().map(|asset| asset.name.to_string()).collect()
    }

    fn metadata(&self, name: &str) -> Result<Metadata> {
        let asset = self.get(name)?;
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(asset.modified);
        Ok(Metadata::file(asset.data.len() as u64, modified))
    }

    fn data(&self, name: &str) -> Result<Bytes> {
        self.get(name).map(|asset| Bytes::from_static(asset.data))
    }
}

/// An [`AssetSource`] assembled at runtime.
///
/// # Examples
///
/// ```rust
/// use asset_fs::{AssetFileSystem, MemorySource};
///
/// let source = MemorySource::new()
///     .with_file("docs/index.html", "<html></html>")
///     .with_file("docs/app.js", "console.log(1)");
/// let fs = AssetFileSystem::new(&source).unwrap();
/// assert!(fs.contains("/docs"));
/// ```
#[derive(Debug, Clone)]
pub struct MemorySource {
    files: Vec<(String, Bytes, SystemTime)>,
    modified: SystemTime,
}

impl Default for MemorySource {
    fn default() -> Self {
        MemorySource {
            files: Vec::new(),
            modified: SystemTime::UNIX_EPOCH,
        }
    }
}

impl MemorySource {
    pub fn new() -> Self {
        MemorySource::default()
    }

    /// Set the modification time reported for files added after this call.
    pub fn with_modified(mut self, modified: SystemTime) -> Self {
        self.modified = modified;
        self
    }

    pub fn with_file(mut self, name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.insert(name, data);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Bytes>) {
        self.files.push((name.into(), data.into(), self.modified));
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn get(&self, name: &str) -> Result<&(String, Bytes, SystemTime)> {
        self.files
            .iter()
            .find(|(n, _, _)| n == name)
            .ok_or(FsError::EntryNotFound)
    }
}

impl AssetSource for MemorySource {
    fn names(&self) -> Vec<String> {
        self.files.iter().map(|(name, _, _)| name.clone()).collect()
    }

    fn metadata(&self, name: &str) -> Result<Metadata> {
        let (_, data, modified) = self.get(name)?;
        Ok(Metadata::file(data.len() as u64, *modified))
    }

    fn data(&self, name: &str) -> Result<Bytes> {
        self.get(name).map(|(_, data, _)| data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static ASSETS: &[EmbeddedAsset] = &[
        EmbeddedAsset::new("a/index.html", b"<html></html>", 1_600_000_000),
        EmbeddedAsset::new("a/app.js", b"", 0),
    ];

    #[test]
    fn embedded_assets_answer_lookups() {
        let source = EmbeddedAssets::new(ASSETS);

        assert_eq!(source.names(), vec!["a/index.html", "a/app.js"]);
        let meta = source.metadata("a/index.html").unwrap();
        assert_eq!(meta.len(), 13);
        assert!(meta.is_file());
        assert_eq!(
            meta.modified(),
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000)
        );
        assert_eq!(source.data("a/app.js").unwrap(), Bytes::new());
    }

    #[test]
    fn unknown_names_are_not_found() {
        let source = EmbeddedAssets::new(ASSETS);
        assert_eq!(source.metadata("nope"), Err(FsError::EntryNotFound));
        assert_eq!(source.data("nope"), Err(FsError::EntryNotFound));

        let memory = MemorySource::new();
        assert!(memory.is_empty());
        assert_eq!(memory.data("nope"), Err(FsError::EntryNotFound));
    }

    #[test]
    fn memory_source_tracks_modification_times() {
        let later = SystemTime::UNIX_EPOCH + Duration::from_secs(42);
        let source = MemorySource::new()
            .with_file("old.txt", "old")
            .with_modified(later)
            .with_file("new.txt", "new");

        assert_eq!(source.len(), 2);
        assert_eq!(
            source.metadata("old.txt").unwrap().modified(),
            SystemTime::UNIX_EPOCH
        );
        assert_eq!(source.metadata("new.txt").unwrap().modified(), later);
    }
}
