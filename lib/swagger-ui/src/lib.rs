//! Serve an embedded [swagger-ui] next to an API specification.
//!
//! The viewer's assets are compiled into the binary and exposed through an
//! [`asset_fs::AssetFileSystem`], so nothing is read from disk at runtime.
//! A [`Handler`] mounts everything under a configurable prefix, serves the
//! caller's specification document at `<prefix>swagger.json` and redirects
//! the prefix itself to the viewer with the document preselected.
//!
//! The embedded `index.html` only carries the page shell, stylesheet and
//! initializer. The swagger-ui JavaScript and CSS themselves are fetched by
//! the browser from the `swagger-ui-dist` package on unpkg.com, so clients
//! need network access to that CDN. For an offline deployment, vendor the
//! dist files into an [`asset_fs::AssetSource`] (e.g. an
//! [`asset_fs::MemorySource`]) and pass it to [`Builder::source()`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use hyper::server::conn::http1;
//! use hyper_util::{rt::TokioIo, service::TowerToHyperService};
//! use swagger_ui::Handler;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let handler = Handler::new("/docs/", r#"{"swagger": "2.0"}"#)?;
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!
//! loop {
//!     let (stream, _) = listener.accept().await?;
//!     let service = TowerToHyperService::new(handler.clone());
//!     tokio::spawn(async move {
//!         let _ = http1::Builder::new()
//!             .serve_connection(TokioIo::new(stream), service)
//!             .await;
//!     });
//! }
//! # }
//! ```
//!
//! [swagger-ui]: https://github.com/swagger-api/swagger-ui

mod error;
mod handler;
mod http_date;
mod serve;
mod spec;

use asset_fs::EmbeddedAssets;
use bytes::Bytes;

pub use crate::{
    error::Error,
    handler::{Builder, Handler},
    spec::{ReadSeek, SpecDocument},
};

/// Where the viewer lives inside the bundle.
pub const BASE_PATH: &str = "/third_party/swagger-ui/";

/// Where the specification document is served, relative to the prefix.
pub const SPEC_FILE: &str = "/swagger.json";

/// The body type of every response.
pub type Body = http_body_util::Full<Bytes>;

mod generated {
    use asset_fs::EmbeddedAsset;

    include!(concat!(env!("OUT_DIR"), "/bundle.rs"));
}

/// The swagger-ui assets compiled into this crate.
pub fn bundle() -> EmbeddedAssets {
    EmbeddedAssets::new(generated::ASSETS)
}
