//! A read-only virtual file system over a fixed set of named byte blobs.
//!
//! An [`AssetFileSystem`] is built once from an [`AssetSource`] and never
//! changes afterwards, so it can be shared between any number of concurrent
//! readers without locking. Every `index.html` in the source also produces a
//! synthetic directory entry for its parent, which is what lets generic
//! "serve the index for a directory" logic work against embedded data.

use std::io;
use std::path::Path;
use std::time::SystemTime;

use thiserror::Error;

mod file;
pub mod path;
mod source;
mod static_fs;

pub use file::AssetFile;
pub use path::{add_prefix, normalize};
pub use source::{AssetSource, EmbeddedAsset, EmbeddedAssets, MemorySource};
pub use static_fs::AssetFileSystem;

pub type Result<T, E = FsError> = std::result::Result<T, E>;

/// The bits of a file system a static file server needs.
pub trait FileSystem {
    fn metadata(&self, path: &Path) -> Result<Metadata>;
    fn open(&self, path: &Path) -> Result<AssetFile>;
}

impl<T: FileSystem + ?Sized> FileSystem for &T {
    fn metadata(&self, path: &Path) -> Result<Metadata> {
        (**self).metadata(path)
    }
    fn open(&self, path: &Path) -> Result<AssetFile> {
        (**self).open(path)
    }
}

impl<T: FileSystem + ?Sized> FileSystem for std::sync::Arc<T> {
    fn metadata(&self, path: &Path) -> Result<Metadata> {
        (**self).metadata(path)
    }
    fn open(&self, path: &Path) -> Result<AssetFile> {
        (**self).open(path)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileType {
    pub dir: bool,
    pub file: bool,
}

impl FileType {
    pub fn new_dir() -> Self {
        Self {
            dir: true,
            ..Default::default()
        }
    }

    pub fn new_file() -> Self {
        Self {
            file: true,
            ..Default::default()
        }
    }

    pub fn is_dir(&self) -> bool {
        self.dir
    }

    pub fn is_file(&self) -> bool {
        self.file
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub ft: FileType,
    pub modified: SystemTime,
    pub len: u64,
}

impl Metadata {
    pub fn file(len: u64, modified: SystemTime) -> Self {
        Metadata {
            ft: FileType::new_file(),
            modified,
            len,
        }
    }

    /// Metadata of an empty directory node.
    pub fn dir(modified: SystemTime) -> Self {
        Metadata {
            ft: FileType::new_dir(),
            modified,
            len: 0,
        }
    }

    pub fn file_type(&self) -> FileType {
        self.ft
    }

    pub fn is_dir(&self) -> bool {
        self.ft.is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.ft.is_file()
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.len
    }
}

/// Error type for external users
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum FsError {
    /// The requested file or directory could not be found
    #[error("entry not found")]
    EntryNotFound,
    /// The operation is not supported on this kind of entry
    #[error("invalid operation")]
    InvalidOperation,
    /// The provided data is invalid
    #[error("invalid input")]
    InvalidInput,
    /// Something failed when doing IO. These errors can generally not be handled.
    #[error("io error")]
    IOError,
    /// Some other unhandled error. If you see this, it's probably a bug.
    #[error("unknown error found")]
    UnknownError,
}

impl From<io::Error> for FsError {
    fn from(io_error: io::Error) -> Self {
        match io_error.kind() {
            io::ErrorKind::NotFound => FsError::EntryNotFound,
            io::ErrorKind::InvalidInput => FsError::InvalidInput,
            io::ErrorKind::Unsupported => FsError::InvalidOperation,
            io::ErrorKind::Other => FsError::IOError,
            _ => FsError::UnknownError,
        }
    }
}

impl From<FsError> for io::Error {
    fn from(val: FsError) -> Self {
        let kind = match val {
            FsError::EntryNotFound => io::ErrorKind::NotFound,
            FsError::InvalidOperation => io::ErrorKind::Unsupported,
            FsError::InvalidInput => io::ErrorKind::InvalidInput,
            FsError::IOError | FsError::UnknownError => io::ErrorKind::Other,
        };
        kind.into()
    }
}
