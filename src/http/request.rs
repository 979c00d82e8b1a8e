use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;

/// HTTP request methods.
///
/// GET, HEAD, POST and OPTIONS are served; PUT, DELETE, TRACE and
/// CONNECT parse but answer 501. Any other token answers 405.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    HEAD,
    POST,
    OPTIONS,
    PUT,
    DELETE,
    TRACE,
    CONNECT,
}

impl Method {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "HEAD" => Some(Method::HEAD),
            "POST" => Some(Method::POST),
            "OPTIONS" => Some(Method::OPTIONS),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "TRACE" => Some(Method::TRACE),
            "CONNECT" => Some(Method::CONNECT),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::OPTIONS => "OPTIONS",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::TRACE => "TRACE",
            Method::CONNECT => "CONNECT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol version from the request line. Anything other than these
/// two exact trailing tokens is a malformed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http10,
    Http11,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http10 => "HTTP/1.0",
            Protocol::Http11 => "HTTP/1.1",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Content-Type` classification for POST bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    UrlEncoded,
    Multipart,
    /// Present but neither urlencoded nor multipart; rejected for POST.
    Other,
}

/// Typed view over the recognized request headers, plus the raw ordered
/// header-line list for pass-through.
///
/// Immutable once constructed. Recognized headers are captured by
/// case-sensitive literal prefix match; the first occurrence wins and
/// later duplicates are ignored.
#[derive(Debug, Default, Clone)]
pub struct HeaderView {
    /// Raw header lines, in wire order.
    pub list: Vec<String>,
    /// `Host` hostname, lowercased.
    pub hostname: Option<String>,
    /// Port from the `Host` value, when present.
    pub port: Option<u16>,
    /// `Content-Length` value.
    pub length: Option<u64>,
    /// `Connection` value, lowercased.
    pub connection: Option<String>,
    /// `Content-Type` classification.
    pub kind: Option<ContentKind>,
    /// Multipart boundary token.
    pub boundary: Option<String>,
    /// `If-None-Match` validator.
    pub etag: Option<String>,
    /// `If-Modified-Since` validator.
    pub modified: Option<String>,
    /// `Range: bytes=` value.
    pub range: Option<String>,
}

/// One uploaded file from a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub name: String,
    pub data: Bytes,
}

/// Decoded POST body: form fields plus file attachments.
///
/// Repeated field names accumulate in order, mirroring standard
/// form-encoded repeated-key semantics. A malformed multipart body
/// decodes to an empty attachment rather than failing the request.
#[derive(Debug, Default, Clone)]
pub struct Attachment {
    pub query: HashMap<String, Vec<String>>,
    pub files: Vec<FilePart>,
}

/// A fully parsed request, handed to the route handler.
///
/// Owned by the engine until dispatch, then moved into the handler.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: String,
    pub protocol: Protocol,
    /// Path component of the URI.
    pub path: String,
    /// Decoded query-string parameters.
    pub query: HashMap<String, Vec<String>>,
    /// Route key the request matched (`host:port`, `host`, `*:port` or `*`).
    pub host: String,
    pub hostname: String,
    pub port: u16,
    pub header: HeaderView,
    /// Decoded POST body; empty for other methods.
    pub attach: Attachment,
    /// Position in the per-connection request sequence.
    pub seq: u64,
}

/// Snapshot of the request fields the response encoder needs, taken
/// before the request itself is moved into the handler. Synthesized
/// error responses that never had a full parse use the defaults.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub protocol: Protocol,
    pub method: Option<Method>,
    pub host: String,
    pub path: String,
    pub connection: Option<String>,
    pub etag: Option<String>,
    pub modified: Option<String>,
    pub range: Option<String>,
}

impl Default for RequestMeta {
    fn default() -> Self {
        Self {
            protocol: Protocol::Http11,
            method: None,
            host: String::new(),
            path: String::new(),
            connection: None,
            etag: None,
            modified: None,
            range: None,
        }
    }
}

impl RequestMeta {
    pub fn of(req: &Request) -> Self {
        Self {
            protocol: req.protocol,
            method: Some(req.method),
            host: req.host.clone(),
            path: req.path.clone(),
            connection: req.header.connection.clone(),
            etag: req.header.etag.clone(),
            modified: req.header.modified.clone(),
            range: req.header.range.clone(),
        }
    }

    /// Context line carried by diagnostic events.
    pub fn describe(&self) -> String {
        format!(
            "{} {} {} {}",
            self.host,
            self.protocol,
            self.method.map(|m| m.as_str()).unwrap_or("-"),
            self.path
        )
    }
}
