use std::{
    convert::Infallible,
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::Poll,
    time::SystemTime,
};

use asset_fs::{add_prefix, AssetFileSystem, AssetSource};
use http::{request::Parts, Request, Response, StatusCode};
use percent_encoding::percent_decode_str;
use tower::Service;

use crate::{
    serve::{encode_path, redirect, serve_file, status},
    Body, Error, SpecDocument, BASE_PATH, SPEC_FILE,
};

#[derive(Debug)]
struct SharedState {
    fs: AssetFileSystem,
    prefix: String,
    viewer_path: String,
    spec_path: String,
    spec: SpecDocument,
    modified: SystemTime,
}

/// Serves the swagger-ui bundle and an API specification under a mount
/// prefix.
///
/// - `GET <prefix>` redirects to the viewer, pointing it at the specification
/// - `GET <prefix>swagger.json` serves the specification document
/// - anything else under the prefix is looked up in the bundle
///
/// Request paths are percent-decoded before routing, so the prefix and asset
/// names are matched in their decoded form. Only `GET` and `HEAD` are served
/// from the bundle and the document, any other method gets
/// `405 Method Not Allowed` with an `Allow: GET, HEAD` header.
///
/// [`Handler`] implements the [`Service`] trait and is cheaply cloneable so
/// it can be plugged into a Hyper server or the Tower ecosystem.
#[derive(Clone, Debug)]
pub struct Handler(Arc<SharedState>);

impl Handler {
    /// Create a handler for the embedded bundle mounted at `prefix` (an empty
    /// prefix means `/`).
    pub fn new(prefix: impl Into<String>, spec: impl Into<SpecDocument>) -> Result<Self, Error> {
        Builder::new().prefix(prefix).build(spec)
    }

    /// Create a [`Builder`] that can be used to configure a [`Handler`].
    pub fn builder() -> Builder {
        Builder::new()
    }

    pub fn prefix(&self) -> &str {
        &self.0.prefix
    }

    /// Where requests for the mount prefix are redirected to.
    pub fn viewer_path(&self) -> &str {
        &self.0.viewer_path
    }

    /// Where the specification document is served.
    pub fn spec_path(&self) -> &str {
        &self.0.spec_path
    }

    pub fn filesystem(&self) -> &AssetFileSystem {
        &self.0.fs
    }

    /// Handle a single HTTP request.
    ///
    /// Failures are logged and reported to the client as a
    /// `500 Internal Server Error`.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(method = %request.method(), path = %request.uri().path()),
    )]
    pub async fn handle<B>(&self, request: Request<B>) -> Response<Body> {
        let (parts, _body) = request.into_parts();

        match self.dispatch(parts).await {
            Ok(response) => {
                tracing::debug!(status = %response.status(), "Request handled");
                response
            }
            Err(e) => {
                tracing::warn!(error = %e, "Unable to handle the request");
                status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    async fn dispatch(&self, parts: Parts) -> Result<Response<Body>, Error> {
        let state = &self.0;
        // Routing and lookups all work on the decoded path
        let path = match percent_decode_str(parts.uri.path()).decode_utf8() {
            Ok(path) => path,
            Err(_) => return Ok(status(StatusCode::BAD_REQUEST)),
        };
        let path: &str = &path;

        if path == state.prefix {
            let target = format!(
                "{}?url={}",
                encode_path(&state.viewer_path),
                encode_path(&state.spec_path)
            );
            return redirect(StatusCode::SEE_OTHER, &target, None);
        }

        if path == state.spec_path {
            return state
                .spec
                .serve(parts.method, parts.headers, state.modified)
                .await;
        }

        let base = state.prefix.trim_end_matches('/');
        match path.strip_prefix(base) {
            // "/foobar" for a "/foobar/" prefix
            Some("") => redirect(
                StatusCode::MOVED_PERMANENTLY,
                &encode_path(&state.prefix),
                parts.uri.query(),
            ),
            Some(rest) if rest.starts_with('/') => serve_file(
                &state.fs,
                &parts.method,
                &parts.headers,
                rest,
                parts.uri.query(),
            ),
            _ => Ok(status(StatusCode::NOT_FOUND)),
        }
    }
}

impl<B> Service<Request<B>> for Handler
where
    B: Send + 'static,
{
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move { Ok(handler.handle(request).await) })
    }
}

/// Configuration for a [`Handler`].
pub struct Builder {
    prefix: String,
    modified: Option<SystemTime>,
    source: Option<Box<dyn AssetSource + Send + Sync>>,
}

impl Builder {
    pub fn new() -> Self {
        Builder {
            prefix: String::from("/"),
            modified: None,
            source: None,
        }
    }

    /// The path everything is mounted under, `/` by default.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = if prefix.is_empty() {
            String::from("/")
        } else {
            prefix
        };
        self
    }

    /// The modification time advertised for the specification document.
    /// Defaults to the moment the handler is built.
    pub fn modified(mut self, modified: SystemTime) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Serve a different bundle instead of the embedded swagger-ui.
    pub fn source(mut self, source: impl AssetSource + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Load the bundle and create the [`Handler`].
    ///
    /// Any failure while loading the bundle is returned as
    /// [`Error::Bundle`], a handler is never built around a partial bundle.
    pub fn build(self, spec: impl Into<SpecDocument>) -> Result<Handler, Error> {
        let Builder {
            prefix,
            modified,
            source,
        } = self;

        let fs = match &source {
            Some(source) => AssetFileSystem::new(source)?,
            None => AssetFileSystem::new(&crate::bundle())?,
        };

        let viewer_path = add_prefix(&prefix, BASE_PATH);
        let spec_path = add_prefix(&prefix, SPEC_FILE);
        tracing::debug!(
            %prefix,
            %viewer_path,
            %spec_path,
            files = fs.entries(),
            "Loaded the bundle"
        );

        Ok(Handler(Arc::new(SharedState {
            fs,
            prefix,
            viewer_path,
            spec_path,
            spec: spec.into(),
            modified: modified.unwrap_or_else(SystemTime::now),
        })))
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("prefix", &self.prefix)
            .field("modified", &self.modified)
            .field("custom_source", &self.source.is_some())
            .finish()
    }
}
