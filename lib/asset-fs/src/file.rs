use std::io::{self, Read, Seek, SeekFrom};
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};

use crate::{FsError, Metadata, Result};

/// An open handle to an entry in an [`crate::AssetFileSystem`].
///
/// The payload is shared with the file system, only the cursor belongs to
/// the handle. Opening the same path twice gives two handles that can be
/// read and seeked independently.
#[derive(Debug, Clone)]
pub struct AssetFile {
    path: String,
    data: Bytes,
    metadata: Metadata,
    cursor: u64,
}

impl AssetFile {
    pub(crate) fn new(path: String, data: Bytes, metadata: Metadata) -> Self {
        AssetFile {
            path,
            data,
            metadata,
            cursor: 0,
        }
    }

    /// The absolute path this handle was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn metadata(&self) -> Metadata {
        self.metadata
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// The current read position.
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// The whole payload, regardless of the cursor.
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Entries are never enumerated through a handle, only through the
    /// file system's path map.
    pub fn read_dir(&self) -> Result<Vec<Metadata>> {
        Err(FsError::InvalidOperation)
    }

    /// Releases the handle. The payload stays owned by the file system.
    pub fn close(self) -> Result<()> {
        Ok(())
    }

    fn remaining(&self) -> &[u8] {
        let start = usize::try_from(self.cursor)
            .unwrap_or(usize::MAX)
            .min(self.data.len());
        &self.data[start..]
    }

    fn seek_to(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, offset) = match pos {
            SeekFrom::Start(s) => {
                self.cursor = s;
                return Ok(s);
            }
            SeekFrom::End(e) => (self.size(), e),
            SeekFrom::Current(c) => (self.cursor, c),
        };
        match base.checked_add_signed(offset) {
            Some(n) => {
                self.cursor = n;
                Ok(n)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}

impl Read for AssetFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.cursor += n as u64;
        Ok(n)
    }
}

impl Seek for AssetFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.seek_to(pos)
    }
}

impl AsyncRead for AssetFile {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let remaining = self.remaining();
        let n = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..n]);
        self.cursor += n as u64;
        Poll::Ready(Ok(()))
    }
}

impl AsyncSeek for AssetFile {
    fn start_seek(mut self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        self.seek_to(position).map(|_| ())
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Poll::Ready(Ok(self.cursor))
    }
}
