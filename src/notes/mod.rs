//! Note storage and the sync API built on it.
//!
//! Clients compare the hashes from `/api/status` against their local copy,
//! then pull changed notes with `/api/get` and push their own with `/api/put`.

pub mod api;
pub mod store;

pub use api::{ApiError, NotesApi, StatusReport};
pub use store::{content_hash, NoteId, NoteStore, RepoName, RepoStatus, StoreError};
