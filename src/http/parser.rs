//! Request decoder.
//!
//! Turns the bytes arriving on one connection into exactly one [`Request`].
//! Malformed input becomes a 400 [`Reply`]; only I/O failures and running
//! out of read retries escape as [`DecodeError`].

use tokio::io::AsyncRead;

use crate::http::request::{wants_keep_alive, Headers, Method, Request};
use crate::http::response::Reply;
use crate::http::retry::{self, ReadError, RetryPolicy};

/// Size of one socket read.
pub const CHUNK_SIZE: usize = 64 * 1024;

const CRLFCRLF: &[u8] = b"\r\n\r\n";
const LFLF: &[u8] = b"\n\n";

/// Result of decoding one request from a connection.
#[derive(Debug)]
pub enum Decoded {
    Request(Request),
    /// The request was unusable; send this reply. `keep_alive` is only true
    /// when the header block parsed and asked for it.
    Reject { reply: Reply, keep_alive: bool },
    /// The peer closed the connection before sending anything.
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("incomplete request: {0}")]
    Read(#[from] ReadError),
}

/// Parse failures that are answered with a 400.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("bad request line")]
    BadRequestLine,
    #[error("empty line between headers and body not found")]
    MissingSeparator,
    #[error("malformed header line")]
    InvalidHeader,
    #[error("invalid content-length")]
    InvalidContentLength,
}

/// A request whose header block parsed, with whatever body bytes came with it.
#[derive(Debug)]
pub struct Head {
    pub method: Method,
    pub path: String,
    pub version: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Head {
    fn content_length(&self) -> Result<Option<usize>, ParseError> {
        self.headers
            .get("content-length")
            .map(|v| {
                v.trim()
                    .parse::<usize>()
                    .map_err(|_| ParseError::InvalidContentLength)
            })
            .transpose()
    }
}

/// Earliest header terminator in `buf`: (offset, terminator length).
fn find_headers_end(buf: &[u8]) -> Option<(usize, usize)> {
    let crlf = buf.windows(4).position(|w| w == CRLFCRLF).map(|p| (p, 4));
    let lf = buf.windows(2).position(|w| w == LFLF).map(|p| (p, 2));
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Splits a complete header block (plus any body fragment) into a [`Head`].
pub fn parse_head(buf: &[u8]) -> Result<Head, ParseError> {
    let line_end = buf.iter().position(|&b| b == b'\n').unwrap_or(buf.len());
    let request_line = String::from_utf8_lossy(&buf[..line_end]);

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    let [method, path, version] = parts.as_slice() else {
        return Err(ParseError::BadRequestLine);
    };

    // The terminator may start on the request line's own line ending.
    let line_start = if line_end > 0 && buf[line_end - 1] == b'\r' {
        line_end - 1
    } else {
        line_end
    };
    let (end, sep_len) =
        find_headers_end(&buf[line_start..]).ok_or(ParseError::MissingSeparator)?;
    let headers_end = line_start + end;
    let body_start = headers_end + sep_len;

    let header_block = if headers_end > line_end {
        String::from_utf8_lossy(&buf[line_end + 1..headers_end]).into_owned()
    } else {
        String::new()
    };

    let mut headers = Headers::new();
    for line in header_block.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let (key, value) = line.split_once(": ").ok_or(ParseError::InvalidHeader)?;
        headers.insert(key.trim(), value.trim());
    }

    Ok(Head {
        method: Method::parse(method),
        path: path.to_string(),
        version: version.to_string(),
        headers,
        body: buf[body_start..].to_vec(),
    })
}

/// Reads and decodes requests with a bounded retry policy.
#[derive(Debug, Clone)]
pub struct RequestDecoder {
    policy: RetryPolicy,
    chunk_size: usize,
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl RequestDecoder {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            chunk_size: CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Decodes one request.
    ///
    /// `prefetched` holds a first chunk already pulled off the socket by
    /// the poll loop; pass an empty vector to have the decoder read it.
    pub async fn decode<R>(
        &self,
        stream: &mut R,
        prefetched: Vec<u8>,
    ) -> Result<Decoded, DecodeError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut buf = prefetched;
        if buf.is_empty() {
            match self.read_first_chunk(stream).await? {
                Some(chunk) => buf = chunk,
                None => return Ok(Decoded::Closed),
            }
        }

        if buf.len() >= self.chunk_size && buf.starts_with(b"GET ") {
            self.read_long_head(stream, &mut buf).await?;
        }

        let head = match parse_head(&buf) {
            Ok(head) => head,
            Err(e) => {
                tracing::debug!(error = %e, "Rejecting malformed request");
                return Ok(Decoded::Reject {
                    reply: Reply::bad_request(e.to_string()),
                    keep_alive: false,
                });
            }
        };

        let keep_alive = wants_keep_alive(&head.headers);
        let content_length = match head.content_length() {
            Ok(len) => len,
            Err(e) => {
                return Ok(Decoded::Reject {
                    reply: Reply::bad_request(e.to_string()),
                    keep_alive,
                });
            }
        };

        let Head {
            method,
            path,
            version,
            headers,
            mut body,
        } = head;

        match content_length {
            Some(len) if body.len() < len => {
                let mut budget = self.policy.budget();
                retry::read_to_len(stream, &mut body, len, self.chunk_size, &mut budget).await?;
            }
            Some(len) => body.truncate(len),
            None => body.clear(),
        }

        Ok(Decoded::Request(Request {
            method,
            path,
            version,
            headers,
            body,
        }))
    }

    /// First read on an idle connection. A clean EOF means the peer is gone;
    /// interrupted or stalled reads are retried against the budget.
    async fn read_first_chunk<R>(&self, stream: &mut R) -> Result<Option<Vec<u8>>, DecodeError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut chunk = vec![0u8; self.chunk_size];
        let mut budget = self.policy.budget();
        match retry::read_some(stream, &mut chunk, &mut budget).await? {
            0 => Ok(None),
            n => {
                chunk.truncate(n);
                Ok(Some(chunk))
            }
        }
    }

    /// Keeps reading an oversized GET until the header block is complete
    /// or the peer stops sending.
    async fn read_long_head<R>(&self, stream: &mut R, buf: &mut Vec<u8>) -> Result<(), DecodeError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut chunk = vec![0u8; self.chunk_size];
        let mut budget = self.policy.budget();
        while !(buf.ends_with(CRLFCRLF) || buf.ends_with(LFLF)) {
            let n = retry::read_some(stream, &mut chunk, &mut budget).await?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    }
}
