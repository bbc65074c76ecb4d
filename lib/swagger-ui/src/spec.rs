use std::fmt;
use std::io::{Cursor, Read, Seek};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use bytes::Bytes;
use http::{HeaderMap, Method, Response};

use crate::{serve::serve_content, Body, Error, SPEC_FILE};

/// Anything the specification document can be read from.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// The API specification served next to the viewer.
///
/// A document backed by a caller's stream has a single cursor, so every
/// request takes a lock for the duration of its seek and read. Documents
/// that are already in memory give each request its own cursor instead.
#[derive(Clone)]
pub struct SpecDocument(Inner);

#[derive(Clone)]
enum Inner {
    InMemory(Bytes),
    Stream(Arc<Mutex<Box<dyn ReadSeek>>>),
}

impl SpecDocument {
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: Read + Seek + Send + 'static,
    {
        let reader: Box<dyn ReadSeek> = Box::new(reader);
        SpecDocument(Inner::Stream(Arc::new(Mutex::new(reader))))
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        SpecDocument(Inner::InMemory(bytes.into()))
    }

    pub(crate) async fn serve(
        &self,
        method: Method,
        headers: HeaderMap,
        modified: SystemTime,
    ) -> Result<Response<Body>, Error> {
        match &self.0 {
            Inner::InMemory(bytes) => {
                let mut cursor = Cursor::new(bytes.clone());
                serve_content(&method, &headers, SPEC_FILE, modified, &mut cursor)
            }
            Inner::Stream(stream) => {
                let stream = Arc::clone(stream);
                // The caller's reader may do real I/O
                tokio::task::spawn_blocking(move || {
                    let mut reader = stream.lock().map_err(|_| Error::Poisoned)?;
                    serve_content(&method, &headers, SPEC_FILE, modified, &mut **reader)
                })
                .await?
            }
        }
    }
}

impl fmt::Debug for SpecDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Inner::InMemory(bytes) => f
                .debug_struct("SpecDocument")
                .field("len", &bytes.len())
                .finish(),
            Inner::Stream(_) => f.debug_struct("SpecDocument").finish_non_exhaustive(),
        }
    }
}

impl From<Bytes> for SpecDocument {
    fn from(value: Bytes) -> Self {
        SpecDocument::from_bytes(value)
    }
}

impl From<Vec<u8>> for SpecDocument {
    fn from(value: Vec<u8>) -> Self {
        SpecDocument::from_bytes(value)
    }
}

impl From<String> for SpecDocument {
    fn from(value: String) -> Self {
        SpecDocument::from_bytes(value)
    }
}

impl From<&'static str> for SpecDocument {
    fn from(value: &'static str) -> Self {
        SpecDocument::from_bytes(value)
    }
}

impl From<&'static [u8]> for SpecDocument {
    fn from(value: &'static [u8]) -> Self {
        SpecDocument::from_bytes(value)
    }
}
