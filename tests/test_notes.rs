use std::collections::BTreeMap;

use pipeline_notes::http::request::{Method, Request, RequestBuilder};
use pipeline_notes::http::response::{Reply, Response, StatusCode};
use pipeline_notes::notes::{
    content_hash, ApiError, NoteId, NoteStore, NotesApi, RepoName, StoreError,
};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

fn api() -> (TempDir, NotesApi) {
    let dir = tempfile::tempdir().unwrap();
    let store = NoteStore::new(dir.path());
    (dir, NotesApi::new(store))
}

fn get(path: &str) -> Request {
    RequestBuilder::new().method(Method::GET).path(path).build().unwrap()
}

fn put(path: &str, body: &[u8]) -> Request {
    RequestBuilder::new()
        .method(Method::PUT)
        .path(path)
        .body(body.to_vec())
        .build()
        .unwrap()
}

fn ok(reply: Reply) -> Response {
    match reply {
        Reply::Ok(resp) => resp,
        Reply::BadRequest(msg) => panic!("unexpected 400: {}", msg),
    }
}

fn json<T: serde::de::DeserializeOwned>(reply: Reply) -> T {
    let resp = ok(reply);
    assert_eq!(resp.mimetype, "application/json");
    serde_json::from_slice(&resp.body).unwrap()
}

#[test]
fn test_put_then_get_round_trip() {
    let (_dir, api) = api();

    let saved = ok(api.handle(&put("/api/put/journal/note-1", b"Title\nbody text")).unwrap());
    assert_eq!(saved.body, b"saved journal/note-1".to_vec());

    let notes: BTreeMap<String, String> =
        json(api.handle(&get("/api/get/journal/note-1")).unwrap());
    assert_eq!(
        notes,
        BTreeMap::from([("journal/note-1".to_string(), "Title\nbody text".to_string())])
    );
}

#[test]
fn test_get_several_ids() {
    let (_dir, api) = api();
    api.handle(&put("/api/put/j/a", b"first")).unwrap();
    api.handle(&put("/api/put/j/b", b"second")).unwrap();

    let notes: BTreeMap<String, String> = json(api.handle(&get("/api/get/j/a,b")).unwrap());

    assert_eq!(notes.len(), 2);
    assert_eq!(notes["j/a"], "first");
    assert_eq!(notes["j/b"], "second");
}

#[test]
fn test_get_missing_note_is_fatal() {
    let (_dir, api) = api();
    api.handle(&put("/api/put/j/a", b"first")).unwrap();

    let err = api.handle(&get("/api/get/j/missing")).unwrap_err();

    assert!(matches!(err, ApiError::Store(_)));
}

#[test]
fn test_put_creates_repo_and_overwrites() {
    let (dir, api) = api();

    api.handle(&put("/api/put/fresh/n", b"v1")).unwrap();
    api.handle(&put("/api/put/fresh/n", b"v2")).unwrap();

    assert_eq!(std::fs::read(dir.path().join("fresh/n")).unwrap(), b"v2");
}

#[test]
fn test_put_without_separator_is_400() {
    let (_dir, api) = api();

    let reply = api.handle(&put("/api/put/justrepo", b"x")).unwrap();

    assert_eq!(reply.status(), StatusCode::BadRequest);
}

#[test]
fn test_list_repo() {
    let (_dir, api) = api();
    api.handle(&put("/api/put/repoX/noteB", b"b")).unwrap();
    api.handle(&put("/api/put/repoX/noteA", b"a")).unwrap();

    let ids: Vec<String> = json(api.handle(&get("/api/list/repoX")).unwrap());

    assert_eq!(ids, vec!["noteA", "noteB"]);
}

#[test]
fn test_list_missing_repo_is_fatal() {
    let (_dir, api) = api();

    assert!(api.handle(&get("/api/list/nothing")).is_err());
}

#[test]
fn test_status_matches_independent_sha256() {
    let (_dir, api) = api();
    api.handle(&put("/api/put/repoX/noteA", b"hello")).unwrap();

    let report: BTreeMap<String, BTreeMap<String, String>> =
        json(api.handle(&get("/api/status/repoX")).unwrap());

    let expected = hex::encode(Sha256::digest(b"hello"));
    assert_eq!(
        expected,
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    assert_eq!(report["repoX"]["repoX/noteA"], expected);
    assert_eq!(content_hash(b"hello"), expected);
}

#[test]
fn test_status_is_idempotent() {
    let (_dir, api) = api();
    api.handle(&put("/api/put/r/a", b"one")).unwrap();
    api.handle(&put("/api/put/r/b", b"two")).unwrap();

    let first = ok(api.handle(&get("/api/status/r")).unwrap());
    let second = ok(api.handle(&get("/api/status/r")).unwrap());

    assert_eq!(first.body, second.body);
}

#[test]
fn test_status_all_and_missing_repo() {
    let (_dir, api) = api();
    api.handle(&put("/api/put/a/n1", b"1")).unwrap();
    api.handle(&put("/api/put/b/n2", b"2")).unwrap();

    let all: BTreeMap<String, BTreeMap<String, String>> =
        json(api.handle(&get("/api/status")).unwrap());
    assert_eq!(all.keys().collect::<Vec<_>>(), vec!["a", "b"]);

    let some: BTreeMap<String, BTreeMap<String, String>> =
        json(api.handle(&get("/api/status/b,ghost")).unwrap());
    assert_eq!(some["b"].len(), 1);
    assert!(some["ghost"].is_empty());
}

#[test]
fn test_status_with_missing_root_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let api = NotesApi::new(NoteStore::new(dir.path().join("not-yet")));

    let all: BTreeMap<String, BTreeMap<String, String>> =
        json(api.handle(&get("/api/status/")).unwrap());

    assert!(all.is_empty());
}

#[test]
fn test_traversal_rejected_before_filesystem_access() {
    let dir = tempfile::tempdir().unwrap();
    // Root does not exist: any filesystem access would fail instead of 400.
    let api = NotesApi::new(NoteStore::new(dir.path().join("absent")));

    for path in [
        "/api/status/..",
        "/api/status/ok,../etc",
        "/api/status/a\\b",
        "/api/list/..",
        "/api/get/../x",
        "/api/get/repo/..",
    ] {
        let reply = api.handle(&get(path)).unwrap();
        assert_eq!(reply.status(), StatusCode::BadRequest, "{}", path);
    }

    let reply = api.handle(&put("/api/put/../escape", b"x")).unwrap();
    assert_eq!(reply.status(), StatusCode::BadRequest);
    assert!(!dir.path().join("escape").exists());
}

#[test]
fn test_name_validation() {
    assert!(RepoName::parse("journal").is_ok());
    assert!(RepoName::parse("").is_err());
    assert!(RepoName::parse("a/b").is_err());
    assert!(RepoName::parse("..").is_err());
    assert!(NoteId::parse("2f1c-uuid").is_ok());
    assert!(NoteId::parse("x/../y").is_err());
}

#[test]
fn test_wrong_method_and_unknown_route() {
    let (_dir, api) = api();

    let reply = api.handle(&get("/api/put/a/b")).unwrap();
    assert_eq!(reply.status(), StatusCode::MethodNotAllowed);

    let reply = api.handle(&get("/api/delete/a/b")).unwrap();
    assert_eq!(reply.status(), StatusCode::NotFound);
}

#[test]
fn test_cors_for_localhost_origin_only() {
    let (_dir, api) = api();
    api.handle(&put("/api/put/r/a", b"1")).unwrap();

    let local = RequestBuilder::new()
        .method(Method::GET)
        .path("/api/list/r")
        .header("Origin", "http://localhost:3000")
        .build()
        .unwrap();
    let resp = ok(api.handle(&local).unwrap());
    assert_eq!(
        resp.header("Access-Control-Allow-Origin"),
        Some("http://localhost:3000")
    );

    let remote = RequestBuilder::new()
        .method(Method::GET)
        .path("/api/list/r")
        .header("Origin", "https://example.com")
        .build()
        .unwrap();
    let resp = ok(api.handle(&remote).unwrap());
    assert_eq!(resp.header("Access-Control-Allow-Origin"), None);
}

#[test]
fn test_store_error_names_operation_and_path() {
    let dir = tempfile::tempdir().unwrap();
    let store = NoteStore::new(dir.path());
    let repo = RepoName::parse("journal").unwrap();
    let id = NoteId::parse("missing").unwrap();

    let err: StoreError = store.read(&repo, &id).unwrap_err();

    assert_eq!(err.op, "read");
    assert_eq!(err.path, dir.path().join("journal").join("missing"));
    assert_eq!(err.source.kind(), std::io::ErrorKind::NotFound);
    let message = err.to_string();
    assert!(message.starts_with("read "));
    assert!(message.contains("missing"));
}
