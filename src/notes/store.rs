//! Filesystem-backed note repositories.
//!
//! Layout: `<root>/<repo>/<note id>`. Every call goes straight to
//! `std::fs`; nothing is cached.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Note id to SHA-256 hex digest, for one repo.
pub type RepoStatus = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} name {name:?}")]
pub struct InvalidName {
    pub kind: &'static str,
    pub name: String,
}

fn validate(kind: &'static str, name: &str) -> Result<(), InvalidName> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// A repo name that is safe to join onto the notes root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepoName(String);

impl RepoName {
    pub fn parse(name: &str) -> Result<Self, InvalidName> {
        validate("repo", name)?;
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A note id that is safe to join onto a repo directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoteId(String);

impl NoteId {
    pub fn parse(id: &str) -> Result<Self, InvalidName> {
        validate("note", id)?;
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A filesystem failure, with the path it happened on.
#[derive(Debug, thiserror::Error)]
#[error("{op} {}: {source}", .path.display())]
pub struct StoreError {
    pub op: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl StoreError {
    fn at<'a>(op: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Self + 'a {
        move |source| StoreError {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// SHA-256 of `bytes`, lower-case hex.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// The key notes are reported under: `{repo}/{id}`.
pub fn note_key(repo: &RepoName, id: &str) -> String {
    format!("{}/{}", repo, id)
}

#[derive(Debug, Clone)]
pub struct NoteStore {
    root: PathBuf,
}

impl NoteStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the notes root if it does not exist yet.
    pub fn ensure_root(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(StoreError::at("create", &self.root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repo_dir(&self, repo: &RepoName) -> PathBuf {
        self.root.join(repo.as_str())
    }

    pub fn note_path(&self, repo: &RepoName, id: &NoteId) -> PathBuf {
        self.repo_dir(repo).join(id.as_str())
    }

    /// Every repo directory under the root, sorted. A missing root has none.
    pub fn repos(&self) -> Result<Vec<RepoName>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::at("list", &self.root)(e)),
        };

        let mut repos = Vec::new();
        for entry in entries {
            let entry = entry.map_err(StoreError::at("list", &self.root))?;
            let is_dir = entry
                .file_type()
                .map_err(StoreError::at("stat", &entry.path()))?
                .is_dir();
            if !is_dir {
                continue;
            }
            if let Some(repo) = entry.file_name().to_str().and_then(|n| RepoName::parse(n).ok()) {
                repos.push(repo);
            }
        }
        repos.sort();
        Ok(repos)
    }

    /// Note ids in a repo, sorted. A missing repo is an error.
    pub fn list(&self, repo: &RepoName) -> Result<Vec<String>, StoreError> {
        let dir = self.repo_dir(repo);
        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir).map_err(StoreError::at("list", &dir))? {
            let entry = entry.map_err(StoreError::at("list", &dir))?;
            let is_file = entry
                .file_type()
                .map_err(StoreError::at("stat", &entry.path()))?
                .is_file();
            if is_file {
                ids.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }

    pub fn read(&self, repo: &RepoName, id: &NoteId) -> Result<String, StoreError> {
        let path = self.note_path(repo, id);
        fs::read_to_string(&path).map_err(StoreError::at("read", &path))
    }

    /// Writes a note verbatim, creating the repo directory if needed.
    /// Concurrent writers to one id race; the last write wins.
    pub fn write(&self, repo: &RepoName, id: &NoteId, body: &[u8]) -> Result<(), StoreError> {
        let dir = self.repo_dir(repo);
        fs::create_dir_all(&dir).map_err(StoreError::at("create", &dir))?;
        let path = dir.join(id.as_str());
        fs::write(&path, body).map_err(StoreError::at("write", &path))
    }

    /// Hash of every note in a repo. A missing repo reports empty.
    pub fn status(&self, repo: &RepoName) -> Result<RepoStatus, StoreError> {
        let dir = self.repo_dir(repo);
        if !dir.is_dir() {
            return Ok(RepoStatus::new());
        }

        let mut status = RepoStatus::new();
        for id in self.list(repo)? {
            let path = dir.join(&id);
            let bytes = fs::read(&path).map_err(StoreError::at("read", &path))?;
            status.insert(note_key(repo, &id), content_hash(&bytes));
        }
        Ok(status)
    }
}
