//! Slash-separated path helpers.
//!
//! Asset names and URL paths always use `/`, whatever the host platform, so
//! these work on strings rather than [`std::path::Path`].

/// Returns the cleaned, absolute form of `path`.
///
/// Empty and `.` segments are dropped, `..` removes the previous segment
/// (never climbing above the root) and the result always starts with `/`.
/// A trailing slash is not kept.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut out = String::with_capacity(path.len() + 1);
    for segment in &segments {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Joins `path` under the mount `prefix`.
///
/// The result is normalized, but a trailing `/` on `path` survives so that
/// directory paths stay directory paths. An empty prefix means the root.
pub fn add_prefix(prefix: &str, path: &str) -> String {
    let mut joined = normalize(&format!("{prefix}/{path}"));
    if path.ends_with('/') && !joined.ends_with('/') {
        joined.push('/');
    }
    joined
}

/// Splits `name` into its directory part (with trailing slash, possibly
/// empty) and its final segment.
pub fn split(name: &str) -> (&str, &str) {
    match name.rfind('/') {
        Some(i) => name.split_at(i + 1),
        None => ("", name),
    }
}
