//! Mimetypes keyed by file extension.

use std::path::Path;

pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";
pub const APPLICATION_JSON: &str = "application/json";
pub const OCTET_STREAM: &str = "application/octet-stream";

const TABLE: &[(&str, &str)] = &[
    ("html", TEXT_HTML),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("png", "image/png"),
    ("ico", "image/x-icon"),
    ("json", "application/manifest+json"),
    ("pem", "application/x-x509-ca-cert"),
    ("txt", TEXT_PLAIN),
];

/// Looks up the mimetype for an extension (case-insensitive).
pub fn for_extension(ext: &str) -> Option<&'static str> {
    TABLE
        .iter()
        .find(|(e, _)| e.eq_ignore_ascii_case(ext))
        .map(|(_, m)| *m)
}

/// Mimetype for a path, if its extension is in the table.
pub fn for_path(path: impl AsRef<Path>) -> Option<&'static str> {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .and_then(for_extension)
}
