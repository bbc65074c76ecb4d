//! Static file serving on top of a [`FileSystem`].
//!
//! This follows the usual file server conventions: directories are served
//! through their `index.html`, trailing slashes are fixed with redirects and
//! file contents go through [`serve_content()`], which implements
//! conditional requests and byte ranges.

use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::SystemTime;

use asset_fs::{normalize, FileSystem, FsError};
use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderValue};
use http::{Method, Response, StatusCode};
use http_body_util::Full;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::{http_date, Body, Error};

const INDEX_PAGE: &str = "/index.html";

/// Bytes that can't appear unescaped in the path of a `Location`.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Serve the entry at `url_path` (already percent-decoded and stripped of any
/// mount prefix).
pub(crate) fn serve_file<F>(
    fs: &F,
    method: &Method,
    headers: &HeaderMap,
    url_path: &str,
    query: Option<&str>,
) -> Result<Response<Body>, Error>
where
    F: FileSystem + ?Sized,
{
    if url_path.ends_with(INDEX_PAGE) {
        return redirect(StatusCode::MOVED_PERMANENTLY, "./", query);
    }

    let name = normalize(url_path);
    let metadata = match fs.metadata(Path::new(&name)) {
        Ok(m) => m,
        Err(e) => return Ok(fs_error(e)),
    };

    if metadata.is_dir() {
        if !url_path.ends_with('/') {
            let target = format!("{}/", encode_path(base_name(url_path)));
            return redirect(StatusCode::MOVED_PERMANENTLY, &target, query);
        }

        let index = if name == "/" {
            INDEX_PAGE.to_string()
        } else {
            format!("{name}{INDEX_PAGE}")
        };
        return match fs.open(Path::new(&index)) {
            Ok(mut file) => {
                let modified = file.metadata().modified();
                serve_content(method, headers, &index, modified, &mut file)
            }
            Err(FsError::EntryNotFound) => {
                tracing::debug!(%name, "Refusing to list a directory without an index");
                Ok(status(StatusCode::FORBIDDEN))
            }
            Err(e) => Ok(fs_error(e)),
        };
    }

    if url_path.ends_with('/') {
        let target = format!("../{}", encode_path(base_name(url_path)));
        return redirect(StatusCode::MOVED_PERMANENTLY, &target, query);
    }

    match fs.open(Path::new(&name)) {
        Ok(mut file) => serve_content(method, headers, &name, metadata.modified(), &mut file),
        Err(e) => Ok(fs_error(e)),
    }
}

/// Reply to a request for `content`, honouring conditional and range
/// headers.
///
/// The `Content-Type` is guessed from `name`'s extension. A `modified` time
/// at the UNIX epoch, or one too far out to be written as an HTTP date, is
/// treated as unknown and never advertised.
pub(crate) fn serve_content<R>(
    method: &Method,
    headers: &HeaderMap,
    name: &str,
    modified: SystemTime,
    content: &mut R,
) -> Result<Response<Body>, Error>
where
    R: Read + Seek + ?Sized,
{
    if method != Method::GET && method != Method::HEAD {
        let response = Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .header(header::ALLOW, "GET, HEAD")
            .body(Body::default())?;
        return Ok(response);
    }

    let modified = http_date::unix_seconds(modified).zip(http_date::format(modified));
    let last_modified = modified.as_ref().map(|(_, formatted)| formatted.as_str());

    match check_preconditions(headers, modified.as_ref().map(|(secs, _)| *secs)) {
        Precondition::Failed => return Ok(status(StatusCode::PRECONDITION_FAILED)),
        Precondition::NotModified => {
            let mut builder = Response::builder().status(StatusCode::NOT_MODIFIED);
            if let Some(lm) = last_modified {
                builder = builder.header(header::LAST_MODIFIED, lm);
            }
            return Ok(builder.body(Body::default())?);
        }
        Precondition::Proceed { honour_range } => {
            let size = content.seek(SeekFrom::End(0))?;
            content.seek(SeekFrom::Start(0))?;

            let range = match headers.get(header::RANGE) {
                Some(value) if honour_range => parse_range(value, size),
                _ => Ok(None),
            };

            let content_type = mime_guess::from_path(name).first_or_octet_stream();
            let mut builder = Response::builder()
                .header(header::CONTENT_TYPE, content_type.as_ref())
                .header(header::ACCEPT_RANGES, "bytes");
            if let Some(lm) = last_modified {
                builder = builder.header(header::LAST_MODIFIED, lm);
            }

            let (code, start, length) = match range {
                Ok(Some(ByteRange { start, length })) => {
                    builder = builder.header(
                        header::CONTENT_RANGE,
                        format!("bytes {}-{}/{}", start, start + length - 1, size),
                    );
                    (StatusCode::PARTIAL_CONTENT, start, length)
                }
                Ok(None) => (StatusCode::OK, 0, size),
                Err(RangeError::NoOverlap) => {
                    let response = builder
                        .status(StatusCode::RANGE_NOT_SATISFIABLE)
                        .header(header::CONTENT_RANGE, format!("bytes */{size}"))
                        .body(Body::default())?;
                    return Ok(response);
                }
                Err(RangeError::Invalid) => {
                    let response = builder
                        .status(StatusCode::RANGE_NOT_SATISFIABLE)
                        .body(Body::default())?;
                    return Ok(response);
                }
            };

            builder = builder.status(code).header(header::CONTENT_LENGTH, length);

            if method == Method::HEAD {
                return Ok(builder.body(Body::default())?);
            }

            let body = read_range(content, start, length)?;
            Ok(builder.body(Full::new(body))?)
        }
    }
}

fn read_range<R>(content: &mut R, start: u64, length: u64) -> io::Result<Bytes>
where
    R: Read + Seek + ?Sized,
{
    content.seek(SeekFrom::Start(start))?;
    let mut buffer = Vec::with_capacity(usize::try_from(length).unwrap_or(0));
    content.take(length).read_to_end(&mut buffer)?;
    if (buffer.len() as u64) < length {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(buffer.into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Precondition {
    Failed,
    NotModified,
    Proceed { honour_range: bool },
}

fn header_date(headers: &HeaderMap, name: header::HeaderName) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(http_date::parse)
        .and_then(http_date::unix_seconds)
}

fn check_preconditions(headers: &HeaderMap, modified: Option<u64>) -> Precondition {
    if let (Some(modified), Some(since)) =
        (modified, header_date(headers, header::IF_UNMODIFIED_SINCE))
    {
        if modified > since {
            return Precondition::Failed;
        }
    }

    if let (Some(modified), Some(since)) =
        (modified, header_date(headers, header::IF_MODIFIED_SINCE))
    {
        if modified <= since {
            return Precondition::NotModified;
        }
    }

    // Without entity tags only the date form of If-Range can ever match.
    let honour_range = match headers.get(header::IF_RANGE) {
        None => true,
        Some(value) => {
            let date = value
                .to_str()
                .ok()
                .and_then(http_date::parse)
                .and_then(http_date::unix_seconds);
            matches!((modified, date), (Some(m), Some(d)) if m == d)
        }
    };

    Precondition::Proceed { honour_range }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ByteRange {
    start: u64,
    length: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeError {
    Invalid,
    NoOverlap,
}

/// Parse a `Range` header against a resource of `size` bytes.
///
/// Only single ranges are served, requests for several ranges get the whole
/// resource.
fn parse_range(value: &HeaderValue, size: u64) -> Result<Option<ByteRange>, RangeError> {
    let value = value.to_str().map_err(|_| RangeError::Invalid)?;
    let specs = value.strip_prefix("bytes=").ok_or(RangeError::Invalid)?;

    let mut ranges = Vec::new();
    let mut no_overlap = false;

    for spec in specs.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (start, end) = spec.split_once('-').ok_or(RangeError::Invalid)?;
        let (start, end) = (start.trim(), end.trim());

        if start.is_empty() {
            // suffix range, the last `end` bytes
            let suffix: u64 = end.parse().map_err(|_| RangeError::Invalid)?;
            if suffix == 0 || size == 0 {
                no_overlap = true;
                continue;
            }
            let length = suffix.min(size);
            ranges.push(ByteRange {
                start: size - length,
                length,
            });
            continue;
        }

        let start: u64 = start.parse().map_err(|_| RangeError::Invalid)?;
        if start >= size {
            no_overlap = true;
            continue;
        }

        let length = if end.is_empty() {
            size - start
        } else {
            let end: u64 = end.parse().map_err(|_| RangeError::Invalid)?;
            if start > end {
                return Err(RangeError::Invalid);
            }
            end.min(size - 1) - start + 1
        };
        ranges.push(ByteRange { start, length });
    }

    match ranges.as_slice() {
        [] if no_overlap => Err(RangeError::NoOverlap),
        [] => Err(RangeError::Invalid),
        [range] => Ok(Some(*range)),
        _ => Ok(None),
    }
}

fn base_name(url_path: &str) -> &str {
    url_path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

/// Escape a decoded path so it can be sent back in a `Location` header.
pub(crate) fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH).to_string()
}

pub(crate) fn redirect(
    code: StatusCode,
    target: &str,
    query: Option<&str>,
) -> Result<Response<Body>, Error> {
    let location = match query {
        Some(q) if !q.is_empty() => format!("{target}?{q}"),
        _ => target.to_string(),
    };
    let response = Response::builder()
        .status(code)
        .header(header::LOCATION, location)
        .body(Body::default())?;
    Ok(response)
}

pub(crate) fn status(code: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::from(
        code.canonical_reason().unwrap_or_default().to_string(),
    ));
    *response.status_mut() = code;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

fn fs_error(error: FsError) -> Response<Body> {
    match error {
        FsError::EntryNotFound => status(StatusCode::NOT_FOUND),
        FsError::InvalidInput => status(StatusCode::BAD_REQUEST),
        other => {
            tracing::warn!(error = %other, "File system lookup failed");
            status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use asset_fs::{AssetFileSystem, MemorySource};
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;

    use super::*;

    const MODIFIED: u64 = 1_700_000_000;

    fn modified() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(MODIFIED)
    }

    fn fs() -> AssetFileSystem {
        let source = MemorySource::new()
            .with_modified(modified())
            .with_file("docs/index.html", "<h1>docs</h1>")
            .with_file("docs/app.js", "console.log('hi')")
            .with_file("notes/readme.txt", "no index here");
        AssetFileSystem::new(&source).unwrap()
    }

    fn range(value: &str, size: u64) -> Result<Option<ByteRange>, RangeError> {
        parse_range(&HeaderValue::from_str(value).unwrap(), size)
    }

    async fn body(response: Response<Body>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    fn get<F: FileSystem>(fs: &F, path: &str) -> Response<Body> {
        serve_file(fs, &Method::GET, &HeaderMap::new(), path, None).unwrap()
    }

    fn serve(method: Method, headers: &HeaderMap, name: &str, data: &[u8]) -> Response<Body> {
        let mut content = Cursor::new(data.to_vec());
        serve_content(&method, headers, name, modified(), &mut content).unwrap()
    }

    #[test]
    fn parse_single_ranges() {
        let cases = [
            ("bytes=0-4", 0, 5),
            ("bytes=5-", 5, 5),
            ("bytes=-3", 7, 3),
            ("bytes=-30", 0, 10),
            ("bytes=8-100", 8, 2),
            ("bytes= 1-1 ", 1, 1),
        ];

        for (value, start, length) in cases {
            assert_eq!(
                range(value, 10),
                Ok(Some(ByteRange { start, length })),
                "{value}"
            );
        }
    }

    #[test]
    fn parse_bad_ranges() {
        assert_eq!(range("bytes=10-", 10), Err(RangeError::NoOverlap));
        assert_eq!(range("bytes=-0", 10), Err(RangeError::NoOverlap));
        assert_eq!(range("bytes=0-0", 0), Err(RangeError::NoOverlap));
        assert_eq!(range("bytes=5-2", 10), Err(RangeError::Invalid));
        assert_eq!(range("items=0-1", 10), Err(RangeError::Invalid));
        assert_eq!(range("bytes=a-b", 10), Err(RangeError::Invalid));
        assert_eq!(range("bytes=", 10), Err(RangeError::Invalid));
    }

    #[test]
    fn multiple_ranges_fall_back_to_everything() {
        assert_eq!(range("bytes=0-1, 4-5", 10), Ok(None));
        assert_eq!(
            range("bytes=0-1, 40-50", 10),
            Ok(Some(ByteRange {
                start: 0,
                length: 2
            }))
        );
    }

    #[tokio::test]
    async fn directories_are_served_through_their_index() {
        let response = get(&fs(), "/docs/");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
        assert_eq!(body(response).await, "<h1>docs</h1>");
    }

    #[test]
    fn slashes_are_fixed_with_redirects() {
        let fs = fs();

        let response = get(&fs, "/docs");
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "docs/");

        let response = get(&fs, "/docs/app.js/");
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "../app.js");

        let response = serve_file(
            &fs,
            &Method::GET,
            &HeaderMap::new(),
            "/docs/index.html",
            Some("a=b"),
        )
        .unwrap();
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "./?a=b");
    }

    #[test]
    fn redirect_targets_are_escaped() {
        let source = MemorySource::new()
            .with_file("café menu/index.html", "<h1>menu</h1>")
            .with_file("café menu/a b.txt", "ab");
        let fs = AssetFileSystem::new(&source).unwrap();

        let response = get(&fs, "/café menu");
        assert_eq!(response.headers()[header::LOCATION], "caf%C3%A9%20menu/");

        let response = get(&fs, "/café menu/a b.txt/");
        assert_eq!(response.headers()[header::LOCATION], "../a%20b.txt");
    }

    #[test]
    fn missing_entries_are_not_found() {
        let fs = fs();

        assert_eq!(get(&fs, "/nope").status(), StatusCode::NOT_FOUND);
        // only directories with an index exist
        assert_eq!(get(&fs, "/notes/").status(), StatusCode::NOT_FOUND);
        assert_eq!(get(&fs, "/notes/readme.txt").status(), StatusCode::OK);
    }

    #[test]
    fn directories_without_an_index_are_forbidden() {
        struct NoIndex(AssetFileSystem);

        impl FileSystem for NoIndex {
            fn metadata(&self, path: &Path) -> asset_fs::Result<asset_fs::Metadata> {
                self.0.metadata(path.to_str().unwrap())
            }
            fn open(&self, path: &Path) -> asset_fs::Result<asset_fs::AssetFile> {
                if path.ends_with("index.html") {
                    return Err(FsError::EntryNotFound);
                }
                self.0.open(path.to_str().unwrap())
            }
        }

        let response = get(&NoIndex(fs()), "/docs/");

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn content_headers() {
        let document = br#"{"openapi": "3.0.0"}"#;

        let response = serve(Method::GET, &HeaderMap::new(), "/swagger.json", document);

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[header::CONTENT_LENGTH], "20");
        assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
        assert_eq!(
            headers[header::LAST_MODIFIED],
            http_date::format(modified()).unwrap().as_str()
        );
        assert_eq!(body(response).await, &document[..]);
    }

    #[test]
    fn unknown_modification_times_are_not_advertised() {
        let mut content = Cursor::new(b"data".to_vec());

        let response = serve_content(
            &Method::GET,
            &HeaderMap::new(),
            "blob",
            SystemTime::UNIX_EPOCH,
            &mut content,
        )
        .unwrap();

        assert!(response.headers().get(header::LAST_MODIFIED).is_none());
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/octet-stream");
    }

    #[test]
    fn far_future_modification_times_are_not_advertised() {
        let mut content = Cursor::new(b"data".to_vec());
        let far_future = SystemTime::UNIX_EPOCH + Duration::from_secs(400_000_000_000);

        let response = serve_content(
            &Method::GET,
            &HeaderMap::new(),
            "a.txt",
            far_future,
            &mut content,
        )
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::LAST_MODIFIED).is_none());
    }

    #[test]
    fn conditional_requests() {
        let cases = [
            (header::IF_MODIFIED_SINCE, MODIFIED, StatusCode::NOT_MODIFIED),
            (header::IF_MODIFIED_SINCE, MODIFIED + 60, StatusCode::NOT_MODIFIED),
            (header::IF_MODIFIED_SINCE, MODIFIED - 60, StatusCode::OK),
            (
                header::IF_UNMODIFIED_SINCE,
                MODIFIED - 60,
                StatusCode::PRECONDITION_FAILED,
            ),
            (header::IF_UNMODIFIED_SINCE, MODIFIED, StatusCode::OK),
        ];

        for (name, secs, expected) in cases {
            let mut headers = HeaderMap::new();
            let date =
                http_date::format(SystemTime::UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
            headers.insert(name.clone(), HeaderValue::from_str(&date).unwrap());

            let response = serve(Method::GET, &headers, "a.txt", b"data");

            assert_eq!(response.status(), expected, "{name}: {date}");
        }
    }

    #[tokio::test]
    async fn partial_content() {
        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, HeaderValue::from_static("bytes=2-5"));
        let response = serve(Method::GET, &headers, "a.txt", b"0123456789");

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 2-5/10");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "4");
        assert_eq!(body(response).await, "2345");
    }

    #[test]
    fn unsatisfiable_ranges() {
        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, HeaderValue::from_static("bytes=100-"));
        let response = serve(Method::GET, &headers, "a.txt", b"0123456789");

        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */10");
    }

    #[tokio::test]
    async fn stale_if_range_serves_everything() {
        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, HeaderValue::from_static("bytes=2-5"));
        let stale = SystemTime::UNIX_EPOCH + Duration::from_secs(MODIFIED - 1);
        let stale = http_date::format(stale).unwrap();
        headers.insert(header::IF_RANGE, HeaderValue::from_str(&stale).unwrap());
        let response = serve(Method::GET, &headers, "a.txt", b"0123456789");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, "0123456789");
    }

    #[tokio::test]
    async fn head_requests_have_no_body() {
        let response = serve(Method::HEAD, &HeaderMap::new(), "a.txt", b"0123456789");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "10");
        assert!(body(response).await.is_empty());
    }

    #[test]
    fn other_methods_are_rejected() {
        let response = serve(Method::POST, &HeaderMap::new(), "a.txt", b"");

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, HEAD");
    }
}
