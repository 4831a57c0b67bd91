use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::{Reply, StatusCode};
use crate::http::mime;

const HTTP_VERSION: &str = "HTTP/1.1";

fn push_header(buf: &mut Vec<u8>, key: &str, value: &str) {
    buf.extend_from_slice(key.as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value.as_bytes());
    buf.extend_from_slice(b"\r\n");
}

pub(crate) fn serialize_reply(reply: &Reply, keep_alive: bool) -> Vec<u8> {
    let bad_request_body;
    let (status, mimetype, headers, body) = match reply {
        Reply::Ok(resp) => (resp.status, resp.mimetype, resp.headers.as_slice(), resp.body.as_slice()),
        Reply::BadRequest(msg) => {
            bad_request_body = format!("HTTP 400: {}", msg);
            (
                StatusCode::BadRequest,
                mime::TEXT_PLAIN,
                &[][..],
                bad_request_body.as_bytes(),
            )
        }
    };

    let mut buf = Vec::with_capacity(256 + body.len());

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        status.as_u16(),
        status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    push_header(
        &mut buf,
        "Connection",
        if keep_alive { "keep-alive" } else { "close" },
    );
    push_header(
        &mut buf,
        "Content-Type",
        &format!("{}; charset=utf-8", mimetype),
    );
    for (k, v) in headers {
        push_header(&mut buf, k, v);
    }
    push_header(&mut buf, "Content-Length", &body.len().to_string());

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf.extend_from_slice(body);

    buf
}

/// A rendered reply waiting to go out on a connection.
pub struct ResponseWriter {
    buffer: Vec<u8>,
}

impl ResponseWriter {
    pub fn new(reply: &Reply, keep_alive: bool) -> Self {
        Self {
            buffer: serialize_reply(reply, keep_alive),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Writes the whole response in one call, then flushes.
    pub async fn write_to_stream<W>(&self, stream: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        stream.write_all(&self.buffer).await?;
        stream.flush().await
    }
}
