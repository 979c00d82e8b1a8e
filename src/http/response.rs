use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use tokio::io::AsyncRead;

/// Response headers with deterministic, insertion-ordered emission.
///
/// Lookup is ASCII case-insensitive. `set` keeps the position of an
/// existing header, so re-encoding the same reply produces the same
/// wire order.
#[derive(Debug, Default, Clone)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        match self.0.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
            Some(slot) => slot.1 = value.into(),
            None => self.0.push((key.to_string(), value.into())),
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.0.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A readable body source with an optionally known length.
pub type Source = Box<dyn AsyncRead + Send + Unpin>;

/// Handler-supplied response body.
pub enum Body {
    Bytes(Bytes),
    Text(String),
    /// File on disk; length resolved via metadata when unknown.
    File { path: PathBuf, len: Option<u64> },
    /// Abstract byte stream; unknown length disables ranges and, when
    /// chunking is off, forces the connection closed at stream end.
    Stream { source: Source, len: Option<u64> },
}

impl Body {
    /// Known byte length, if any.
    pub fn len(&self) -> Option<u64> {
        match self {
            Body::Bytes(b) => Some(b.len() as u64),
            Body::Text(s) => Some(s.len() as u64),
            Body::File { len, .. } => *len,
            Body::Stream { len, .. } => *len,
        }
    }

    /// True for bodies piped from a source rather than held in memory.
    pub fn is_source(&self) -> bool {
        matches!(self, Body::File { .. } | Body::Stream { .. })
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Bytes(b) => write!(f, "Bytes({})", b.len()),
            Body::Text(s) => write!(f, "Text({})", s.len()),
            Body::File { path, len } => write!(f, "File({:?}, {:?})", path, len),
            Body::Stream { len, .. } => write!(f, "Stream({:?})", len),
        }
    }
}

/// What a route handler returns: status, headers and a body.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub headers: Headers,
    pub body: Body,
}

impl Reply {
    pub fn new(body: Body) -> Self {
        Self {
            status: 200,
            headers: Headers::new(),
            body,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::new(Body::Text(s.into()))
    }

    pub fn bytes(b: impl Into<Bytes>) -> Self {
        Self::new(Body::Bytes(b.into()))
    }

    /// File body; the engine resolves the length (and `Last-Modified`
    /// when caching) before encoding.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Body::File {
            path: path.into(),
            len: None,
        })
    }

    pub fn stream(source: Source, len: Option<u64>) -> Self {
        Self::new(Body::Stream { source, len })
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.set(key, value);
        self
    }
}

/// Synthesized error response: status text body, plain content type,
/// optionally demanding connection close. Unroutable statuses would be
/// a bug in the engine itself, hence the unwrap-by-panic in `reason`.
pub(crate) fn error_reply(status: u16, close: bool) -> Reply {
    let mut reply = Reply::text(status_text(status))
        .status(status)
        .header("Content-Type", "text/plain");
    if close {
        reply = reply.header("Connection", "close");
    }
    reply
}

/// Full status text, e.g. `404 Not Found`.
pub fn status_text(status: u16) -> String {
    match reason(status) {
        Some(r) => format!("{status} {r}"),
        None => panic!("invalid http status code: {status}"),
    }
}

/// RFC 7231 reason phrase registry.
pub fn reason(status: u16) -> Option<&'static str> {
    Some(match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Range Not Satisfiable",
        417 => "Expectation Failed",
        426 => "Upgrade Required",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => return None,
    })
}
