use crate::http::mime;

/// HTTP status codes the server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use pipeline_notes::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
        }
    }
}

/// A complete application response.
///
/// `Content-Length` and `Connection` are not stored here; the encoder
/// derives them when the reply is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    /// Bare mimetype; the encoder appends the charset
    pub mimetype: &'static str,
    /// Extra headers, written in insertion order
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```
/// # use pipeline_notes::http::response::{ResponseBuilder, StatusCode};
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .mimetype("application/json")
///     .header("Cache-Control", "no-cache")
///     .body(b"{}".to_vec())
///     .build();
/// assert_eq!(response.header("cache-control"), Some("no-cache"));
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    mimetype: &'static str,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            mimetype: mime::TEXT_PLAIN,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn mimetype(mut self, mimetype: &'static str) -> Self {
        self.mimetype = mimetype;
        self
    }

    /// Adds or replaces a header. Names compare case-insensitively.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((key, value)),
        }
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Response {
        Response {
            status: self.status,
            mimetype: self.mimetype,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// A 200 OK carrying `body` with the given mimetype.
    pub fn ok(body: impl Into<Vec<u8>>, mimetype: &'static str) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .mimetype(mimetype)
            .body(body)
            .build()
    }

    /// A 200 OK with a serialized JSON body.
    pub fn json<T: serde::Serialize>(value: &T) -> serde_json::Result<Self> {
        Ok(Self::ok(serde_json::to_vec(value)?, mime::APPLICATION_JSON))
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::ok(body.into().into_bytes(), mime::TEXT_PLAIN)
    }

    pub fn not_found() -> Self {
        ResponseBuilder::new(StatusCode::NotFound)
            .body(b"404 Not Found".to_vec())
            .build()
    }

    pub fn method_not_allowed() -> Self {
        ResponseBuilder::new(StatusCode::MethodNotAllowed)
            .body(b"405 Method Not Allowed".to_vec())
            .build()
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Adds or replaces a header on an already-built response.
    pub fn with_header(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let Response {
            status,
            mimetype,
            headers,
            body,
        } = self;
        ResponseBuilder {
            status,
            mimetype,
            headers,
            body,
        }
        .header(key, value)
        .build()
    }
}

/// What a handler hands to the encoder.
///
/// Either a full response or a bad-request message; the encoder turns
/// both into wire bytes through [`Reply::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok(Response),
    BadRequest(String),
}

impl Reply {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Reply::BadRequest(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Reply::Ok(resp) => resp.status,
            Reply::BadRequest(_) => StatusCode::BadRequest,
        }
    }

    /// Serializes the reply to its exact wire form.
    pub fn render(&self, keep_alive: bool) -> Vec<u8> {
        crate::http::writer::serialize_reply(self, keep_alive)
    }
}

impl From<Response> for Reply {
    fn from(resp: Response) -> Self {
        Reply::Ok(resp)
    }
}
