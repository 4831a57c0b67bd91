//! The four sync verbs under `/api`.

use std::collections::BTreeMap;

use crate::http::request::{Method, Request};
use crate::http::response::{Reply, Response};
use crate::notes::store::{note_key, InvalidName, NoteId, NoteStore, RepoName, RepoStatus, StoreError};

pub const API_PREFIX: &str = "/api";

/// Repo name to its status map.
pub type StatusReport = BTreeMap<String, RepoStatus>;

/// Failures that abort the request instead of producing a reply.
///
/// A missing note or repo lands here too: it is not turned into a 404.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<InvalidName> for Reply {
    fn from(e: InvalidName) -> Self {
        Reply::bad_request(e.to_string())
    }
}

/// Whether `origin` points at localhost on any port.
pub fn is_localhost_origin(origin: &str) -> bool {
    url::Url::parse(origin)
        .ok()
        .and_then(|u| u.host_str().map(|h| h == "localhost"))
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct NotesApi {
    store: NoteStore,
}

impl NotesApi {
    pub fn new(store: NoteStore) -> Self {
        Self { store }
    }

    pub fn handle(&self, req: &Request) -> Result<Reply, ApiError> {
        let route = req.route();
        let rest = route.strip_prefix(API_PREFIX).unwrap_or(route);
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        let (verb, arg) = match rest.split_once('/') {
            Some((verb, arg)) => (verb, Some(arg)),
            None => (rest, None),
        };

        let reply = match (verb, &req.method) {
            ("list", Method::GET) => self.list(arg)?,
            ("get", Method::GET) => self.get(arg)?,
            ("put", Method::PUT) => self.put(arg, &req.body)?,
            ("status", Method::GET) => self.status(arg)?,
            ("list" | "get" | "status" | "put", _) => Response::method_not_allowed().into(),
            _ => Response::not_found().into(),
        };

        Ok(match (reply, req.header("origin")) {
            (Reply::Ok(resp), Some(origin)) if is_localhost_origin(origin) => {
                Reply::Ok(resp.with_header("Access-Control-Allow-Origin", origin))
            }
            (reply, _) => reply,
        })
    }

    fn list(&self, arg: Option<&str>) -> Result<Reply, ApiError> {
        let repo = match RepoName::parse(arg.unwrap_or("")) {
            Ok(repo) => repo,
            Err(e) => return Ok(e.into()),
        };
        let ids = self.store.list(&repo)?;
        Ok(Response::json(&ids)?.into())
    }

    fn get(&self, arg: Option<&str>) -> Result<Reply, ApiError> {
        let (repo, ids) = match split_note_path(arg) {
            Ok(parts) => parts,
            Err(reply) => return Ok(reply),
        };
        let repo = match RepoName::parse(repo) {
            Ok(repo) => repo,
            Err(e) => return Ok(e.into()),
        };
        let ids = match ids
            .split(',')
            .filter(|id| !id.is_empty())
            .map(NoteId::parse)
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(ids) => ids,
            Err(e) => return Ok(e.into()),
        };

        let mut notes = BTreeMap::new();
        for id in &ids {
            let text = self.store.read(&repo, id)?;
            notes.insert(note_key(&repo, id.as_str()), text);
        }
        Ok(Response::json(&notes)?.into())
    }

    fn put(&self, arg: Option<&str>, body: &[u8]) -> Result<Reply, ApiError> {
        let (repo, id) = match split_note_path(arg) {
            Ok(parts) => parts,
            Err(reply) => return Ok(reply),
        };
        let (repo, id) = match (RepoName::parse(repo), NoteId::parse(id)) {
            (Ok(repo), Ok(id)) => (repo, id),
            (Err(e), _) | (_, Err(e)) => return Ok(e.into()),
        };

        self.store.write(&repo, &id, body)?;
        tracing::info!(repo = %repo, note = %id, bytes = body.len(), "Note saved");
        Ok(Response::text(format!("saved {}", note_key(&repo, id.as_str()))).into())
    }

    fn status(&self, arg: Option<&str>) -> Result<Reply, ApiError> {
        let repos = match arg.filter(|a| !a.is_empty()) {
            None => self.store.repos()?,
            Some(list) => match list
                .split(',')
                .map(RepoName::parse)
                .collect::<Result<Vec<_>, _>>()
            {
                Ok(repos) => repos,
                Err(e) => return Ok(e.into()),
            },
        };

        let mut report = StatusReport::new();
        for repo in &repos {
            report.insert(repo.to_string(), self.store.status(repo)?);
        }
        Ok(Response::json(&report)?.into())
    }
}

/// Splits `{repo}/{rest}`; a path with no separator is a 400.
fn split_note_path(arg: Option<&str>) -> Result<(&str, &str), Reply> {
    arg.and_then(|a| a.split_once('/'))
        .ok_or_else(|| Reply::bad_request("note path must be {repo}/{id}"))
}
