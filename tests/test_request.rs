use pipeline_notes::http::request::{Headers, Method, Request, RequestBuilder};

fn request_with(headers: &[(&str, &str)]) -> Request {
    headers
        .iter()
        .fold(RequestBuilder::new().method(Method::GET).path("/"), |b, (k, v)| {
            b.header(k, *v)
        })
        .build()
        .unwrap()
}

#[test]
fn test_request_header_retrieval() {
    let req = request_with(&[("Host", "example.com"), ("Content-Type", "text/plain")]);

    assert_eq!(req.header("Host"), Some("example.com"));
    assert_eq!(req.header("host"), Some("example.com"));
    assert_eq!(req.header("CONTENT-TYPE"), Some("text/plain"));
    assert_eq!(req.header("Missing"), None);
}

#[test]
fn test_headers_last_insert_wins() {
    let mut headers = Headers::new();
    headers.insert("Origin", "http://a");
    headers.insert("origin", "http://b");

    assert_eq!(headers.len(), 1);
    assert_eq!(headers.get("ORIGIN"), Some("http://b"));
}

#[test]
fn test_request_content_length_parsing() {
    let req = request_with(&[("Content-Length", "42")]);
    assert_eq!(req.content_length(), Some(42));
}

#[test]
fn test_request_content_length_missing_or_invalid() {
    assert_eq!(request_with(&[]).content_length(), None);
    assert_eq!(
        request_with(&[("Content-Length", "not-a-number")]).content_length(),
        None
    );
}

#[test]
fn test_request_keep_alive_requires_explicit_header() {
    // Unlike plain HTTP/1.1, a missing Connection header means close.
    assert!(!request_with(&[]).keep_alive());
    assert!(!request_with(&[("Connection", "close")]).keep_alive());
    assert!(!request_with(&[("Connection", "upgrade")]).keep_alive());
}

#[test]
fn test_request_keep_alive_case_insensitive() {
    assert!(request_with(&[("Connection", "keep-alive")]).keep_alive());
    assert!(request_with(&[("connection", "Keep-Alive")]).keep_alive());
}

#[test]
fn test_request_method_parse() {
    assert_eq!(Method::parse("GET"), Method::GET);
    assert_eq!(Method::parse("PUT"), Method::PUT);
    assert_eq!(Method::parse("get"), Method::Other("get".to_string())); // Case-sensitive
    assert_eq!(Method::parse("POST").as_str(), "POST");
}

#[test]
fn test_request_route_strips_query() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .path("/style.css?v=abc")
        .build()
        .unwrap();

    assert_eq!(req.route(), "/style.css");
    assert_eq!(req.path, "/style.css?v=abc");
}

#[test]
fn test_request_builder_requires_method_and_path() {
    assert!(RequestBuilder::new().path("/").build().is_err());
    assert!(RequestBuilder::new().method(Method::GET).build().is_err());
}
