use pipeline_notes::http::response::{Reply, Response, ResponseBuilder, StatusCode};
use pipeline_notes::http::writer::ResponseWriter;

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    assert_eq!(StatusCode::NotFound.as_u16(), 404);
    assert_eq!(StatusCode::MethodNotAllowed.as_u16(), 405);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    assert_eq!(StatusCode::BadRequest.reason_phrase(), "Bad Request");
    assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    assert_eq!(
        StatusCode::MethodNotAllowed.reason_phrase(),
        "Method Not Allowed"
    );
}

#[test]
fn test_response_builder_replaces_header_case_insensitively() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("X-Custom", "one")
        .header("x-custom", "two")
        .build();

    assert_eq!(response.headers.len(), 1);
    assert_eq!(response.header("X-CUSTOM"), Some("two"));
}

#[test]
fn test_render_exact_bytes() {
    let reply: Reply = Response::ok(b"hello".to_vec(), "text/plain").into();

    let bytes = reply.render(false);

    assert_eq!(
        bytes,
        b"HTTP/1.1 200 OK\r\n\
          Connection: close\r\n\
          Content-Type: text/plain; charset=utf-8\r\n\
          Content-Length: 5\r\n\
          \r\n\
          hello"
            .to_vec()
    );
}

#[test]
fn test_render_keep_alive_and_extra_headers_in_order() {
    let reply: Reply = ResponseBuilder::new(StatusCode::Ok)
        .mimetype("application/json")
        .header("X-First", "1")
        .header("X-Second", "2")
        .body(b"[]".to_vec())
        .build()
        .into();

    let text = String::from_utf8(reply.render(true)).unwrap();

    assert!(text.starts_with("HTTP/1.1 200 OK\r\nConnection: keep-alive\r\n"));
    let first = text.find("X-First: 1").unwrap();
    let second = text.find("X-Second: 2").unwrap();
    let length = text.find("Content-Length: 2").unwrap();
    assert!(first < second && second < length);
    assert!(text.ends_with("\r\n\r\n[]"));
}

#[test]
fn test_render_bad_request() {
    let text = String::from_utf8(Reply::bad_request("bad request line").render(false)).unwrap();

    assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(text.contains("Content-Type: text/plain; charset=utf-8\r\n"));
    assert!(text.contains("Content-Length: 26\r\n"));
    assert!(text.ends_with("\r\n\r\nHTTP 400: bad request line"));
}

#[test]
fn test_render_content_length_counts_bytes_not_chars() {
    let reply: Reply = Response::text("héllo").into();
    let text = String::from_utf8(reply.render(false)).unwrap();

    assert!(text.contains("Content-Length: 6\r\n"));
}

#[test]
fn test_response_json_helper() {
    let response = Response::json(&vec!["a", "b"]).unwrap();

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.mimetype, "application/json");
    assert_eq!(response.body, br#"["a","b"]"#.to_vec());
}

#[test]
fn test_response_not_found_helper() {
    let response = Response::not_found();

    assert_eq!(response.status, StatusCode::NotFound);
    assert_eq!(response.body, b"404 Not Found".to_vec());
}

#[tokio::test]
async fn test_writer_writes_rendered_bytes() {
    let reply: Reply = Response::text("ok").into();
    let writer = ResponseWriter::new(&reply, true);
    let mut out: Vec<u8> = Vec::new();

    writer.write_to_stream(&mut out).await.unwrap();

    assert_eq!(out, reply.render(true));
    assert_eq!(writer.as_bytes(), out.as_slice());
}
