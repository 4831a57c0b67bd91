//! Static assets for the browser client.
//!
//! Allow-listed names are served from the static root. Anything else is
//! served only after a filesystem check that it stays under the root;
//! unknown routes fall back to the root document so client-side routing
//! works, and traversal attempts get a 404.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::http::mime;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::notes::store::content_hash;

pub const ROOT_DOCUMENT: &str = "index.html";
pub const CERT_ROUTE: &str = "/pipeline-cert.pem";
pub const VERSION_MARKER: &str = "<!-- ASSET_VERSIONS -->";
pub const CONTENT_HASH_HEADER: &str = "X-Content-Hash";

/// Assets the service worker caches; their hashes go into the root document.
pub const CACHEABLE_ASSETS: &[&str] = &[
    "style.css",
    "manifest.json",
    "boolean-state.js",
    "calendar.js",
    "components.js",
    "date-util.js",
    "elem.js",
    "filedb.js",
    "flatdb.js",
    "global.js",
    "indexed-fs.js",
    "parse.js",
    "ref.js",
    "remote.js",
    "render.js",
    "rewrite.js",
    "state.js",
    "status.js",
    "sync.js",
];

pub const NON_CACHEABLE_ASSETS: &[&str] = &["service-worker.js", "sw-index.html"];

pub const ICONS: &[&str] = &[
    "favicon.ico",
    "icon512.png",
    "maskable_icon.png",
    "maskable_icon_x192.png",
];

#[derive(Debug, Clone)]
pub struct StaticAssets {
    root: PathBuf,
    cert_path: PathBuf,
}

impl StaticAssets {
    pub fn new(root: impl Into<PathBuf>, cert_path: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cert_path: cert_path.into(),
        }
    }

    /// Answers a GET for `route` (query string already stripped).
    pub fn serve(&self, route: &str) -> Response {
        if route == CERT_ROUTE {
            return self
                .file_response(&self.cert_path)
                .unwrap_or_else(Response::not_found);
        }

        let name = route.trim_start_matches('/');
        if name.is_empty() || name == ROOT_DOCUMENT {
            return self.root_document();
        }

        if is_allow_listed(name) {
            return self
                .file_response(&self.root.join(name))
                .unwrap_or_else(|| self.root_document());
        }

        match self.resolve(name) {
            Lookup::Found(path) => self
                .file_response(&path)
                .unwrap_or_else(|| self.root_document()),
            Lookup::Missing => self.root_document(),
            Lookup::Unsafe => {
                tracing::warn!(route, "Refusing unsafe static path");
                Response::not_found()
            }
        }
    }

    /// The SPA root with per-asset version tags in place of the marker.
    pub fn root_document(&self) -> Response {
        let path = self.root.join(ROOT_DOCUMENT);
        let html = match std::fs::read_to_string(&path) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Root document unavailable");
                return Response::not_found();
            }
        };

        let versions = self.asset_versions();
        let tags = format!(
            "<script>window.ASSET_VERSIONS = {};</script>",
            serde_json::to_string(&versions).unwrap_or_else(|_| "{}".to_string())
        );
        Response::ok(html.replacen(VERSION_MARKER, &tags, 1), mime::TEXT_HTML)
    }

    /// Content hash of every cacheable asset present on disk.
    pub fn asset_versions(&self) -> BTreeMap<&'static str, String> {
        CACHEABLE_ASSETS
            .iter()
            .filter_map(|name| {
                std::fs::read(self.root.join(name))
                    .ok()
                    .map(|bytes| (*name, content_hash(&bytes)))
            })
            .collect()
    }

    fn file_response(&self, path: &Path) -> Option<Response> {
        let body = std::fs::read(path).ok()?;
        let hash = content_hash(&body);
        Some(
            ResponseBuilder::new(StatusCode::Ok)
                .mimetype(mime::for_path(path).unwrap_or(mime::OCTET_STREAM))
                .header(CONTENT_HASH_HEADER, hash)
                .body(body)
                .build(),
        )
    }

    fn resolve(&self, name: &str) -> Lookup {
        let relative = Path::new(name);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
            || name.contains('\\')
        {
            return Lookup::Unsafe;
        }
        if mime::for_path(relative).is_none() {
            return Lookup::Missing;
        }

        let (Ok(root), Ok(target)) = (
            self.root.canonicalize(),
            self.root.join(relative).canonicalize(),
        ) else {
            return Lookup::Missing;
        };
        if !target.starts_with(&root) {
            return Lookup::Unsafe;
        }
        if target.is_file() {
            Lookup::Found(target)
        } else {
            Lookup::Missing
        }
    }
}

enum Lookup {
    Found(PathBuf),
    Missing,
    Unsafe,
}

fn is_allow_listed(name: &str) -> bool {
    CACHEABLE_ASSETS
        .iter()
        .chain(NON_CACHEABLE_ASSETS)
        .chain(ICONS)
        .any(|asset| *asset == name)
}
