use std::path::Path;

use axum::http::{header, HeaderMap, Uri};

/// Escape HTML special characters
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Lexically clean a slash-separated path.
///
/// Repeated slashes collapse, `.` segments drop, and `..` removes the
/// preceding segment. A rooted path never climbs above `/`; a relative path
/// keeps leading `..` segments it cannot cancel. The empty path cleans to `.`.
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Last element of a slash-separated path, ignoring trailing slashes
pub fn path_base(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Everything before the last element of a slash-separated path, cleaned
pub fn path_dir(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => clean_path(&path[..=idx]),
        None => ".".to_string(),
    }
}

/// Extension of the last path element, including the leading dot
pub fn path_ext(path: &str) -> &str {
    for (idx, ch) in path.char_indices().rev() {
        match ch {
            '/' => break,
            '.' => return &path[idx..],
            _ => {}
        }
    }
    ""
}

/// Determine content type for a file based on its extension
pub fn media_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "txt" | "log" => "text/plain",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "gz" => "application/gzip",
        _ => "application/octet-stream",
    }
}

/// Host a client addressed: the `Host` header, then the URI authority,
/// then `localhost`
pub fn request_host(headers: &HeaderMap, uri: &Uri) -> String {
    headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|authority| authority.to_string()))
        .unwrap_or_else(|| "localhost".to_string())
}

/// Rebuild the absolute URL a client used to reach this request.
///
/// The scheme is always `http`.
pub fn absolute_url(headers: &HeaderMap, uri: &Uri) -> String {
    let host = request_host(headers, uri);
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    format!("http://{host}{path_and_query}")
}
