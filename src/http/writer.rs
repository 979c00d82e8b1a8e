use std::time::SystemTime;

use bytes::{Bytes, BytesMut};

use crate::diag::Diagnostics;
use crate::http::range::{self, Window};
use crate::http::request::{Method, Protocol, RequestMeta};
use crate::http::response::{Body, Headers, Reply, status_text};
use crate::options::Options;

const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// Encoded response, ready for the wire.
pub enum Emission {
    /// Status line, headers and any in-memory body in one buffer.
    Buffer { bytes: Bytes, close: bool },
    /// Headers written up front, body piped from a source afterwards.
    Stream {
        head: Bytes,
        body: Body,
        /// Byte window to serve when the response is a 206.
        window: Option<Window>,
        /// Chunked-encoding frame size; 0 means plain piping.
        chunk_size: usize,
        close: bool,
    },
}

impl Emission {
    pub fn close(&self) -> bool {
        match self {
            Emission::Buffer { close, .. } => *close,
            Emission::Stream { close, .. } => *close,
        }
    }
}

/// Encodes a handler reply into wire bytes.
///
/// Applies, in order: status validation, error-policy connection
/// handling, cache negotiation, persistence, range computation,
/// header defaults, and chunked-vs-fixed framing. Every response,
/// synthesized errors included, funnels through here, so defaults like
/// `Date` and `Server` are uniform.
///
/// # Panics
///
/// Panics on a status code outside the RFC 7231 registry; that is a
/// programming error in the handler, not a protocol condition.
pub fn encode(meta: &RequestMeta, reply: Reply, opts: &Options, diag: &Diagnostics) -> Emission {
    let Reply {
        status,
        mut headers,
        body,
    } = reply;
    let status = if status == 0 { 200 } else { status };
    let _ = status_text(status); // validate early, panics on unknown codes

    let mut body = match body {
        Body::Text(s) => Body::Bytes(Bytes::from(s)),
        b => b,
    };
    let src = body.is_source();

    if status >= 400 {
        // 413 is an unrecoverable trust violation: close regardless of policy
        if opts.close_on_error || status == 413 {
            headers.set("Connection", "close");
        }
        diag.emit(status, format!("{status} {}", meta.describe()));
    }

    // caller-supplied Content-Length overrides the body's own length
    let mut len: Option<u64> = headers
        .get("Content-Length")
        .and_then(|v| v.parse().ok())
        .or_else(|| body.len());

    // cache negotiation; streamed sources never get a computed ETag
    let mut cached = false;
    if opts.cache {
        if !src && !headers.contains("ETag") {
            if let Body::Bytes(b) = &body {
                headers.set("ETag", range::etag(b));
            }
        }
        let etag_match = match (meta.etag.as_deref(), headers.get("ETag")) {
            (Some(want), Some(have)) => want == have,
            _ => false,
        };
        let modified_match = match (meta.modified.as_deref(), headers.get("Last-Modified")) {
            (Some(want), Some(have)) => want == have,
            _ => false,
        };
        let both_present = meta.etag.is_some()
            && meta.modified.is_some()
            && headers.contains("ETag")
            && headers.contains("Last-Modified");
        if both_present {
            if etag_match && modified_match {
                headers.remove("ETag");
                headers.remove("Last-Modified");
                cached = true;
            }
        } else {
            if etag_match {
                headers.remove("ETag");
                cached = true;
            }
            if modified_match {
                headers.remove("Last-Modified");
                cached = true;
            }
        }
    } else {
        headers.remove("ETag");
        headers.remove("Last-Modified");
    }

    // keep-alive only for HTTP/1.1 when the client asked for it and no
    // header forces close
    let mut keep = meta.protocol == Protocol::Http11
        && meta.connection.as_deref() == Some("keep-alive");
    if headers.get("Connection").is_some_and(|c| c != "keep-alive") {
        keep = false;
    }

    // range requests
    let mut line_status = status;
    let mut window: Option<Window> = None;
    let mut range_handled = false;
    if opts.ranges
        && status == 200
        && len.is_some_and(|l| l > 0)
        && meta.protocol == Protocol::Http11
        && meta.range.is_some()
    {
        range_handled = true;
        // a partial body must not carry whole-resource validators
        headers.remove("ETag");
        headers.remove("Last-Modified");
        let total = len.unwrap_or(0);
        match range::resolve(meta.range.as_deref().unwrap_or(""), total) {
            Some((start, end)) => {
                line_status = 206;
                headers.set("Content-Range", format!("bytes {}-{}/{}", start, end - 1, total));
                len = Some(end - start);
                headers.set("Content-Length", (end - start).to_string());
                if let Body::Bytes(b) = &mut body {
                    // the total may exceed the real buffer when the
                    // caller overrode Content-Length; keep the slice
                    // in bounds
                    let hi = (end as usize).min(b.len());
                    let lo = (start as usize).min(hi);
                    *b = b.slice(lo..hi);
                } else {
                    window = Some((start, end));
                }
            }
            None => {
                diag.emit(416, format!("416 {}", meta.describe()));
                line_status = 416;
                headers.set("Content-Range", format!("bytes */{total}"));
                headers.set("Accept-Ranges", "bytes");
                len = Some(0);
                if opts.close_on_error {
                    keep = false;
                }
            }
        }
    }
    if !range_handled && cached {
        line_status = 304;
    }

    // framing decision before the Connection header is pinned: an
    // unchunked source of unknown length can only end by closing
    let chunking = opts.chunked > 0
        && meta.protocol == Protocol::Http11
        && len.map_or(true, |l| l > opts.chunked as u64);
    let head_only = meta.method == Some(Method::HEAD) || cached || len == Some(0);
    if src && !head_only && !chunking && len.is_none() {
        keep = false;
    }

    // defaults
    if !headers.contains("Content-Type") {
        headers.set("Content-Type", DEFAULT_CONTENT_TYPE);
    }
    if !headers.contains("Date") {
        headers.set("Date", httpdate::fmt_http_date(SystemTime::now()));
    }
    if !headers.contains("Server") {
        if let Some(name) = &opts.name {
            headers.set("Server", name.clone());
        }
    }
    if !headers.contains("Content-Length") {
        if let Some(l) = len {
            headers.set("Content-Length", l.to_string());
        }
    }
    if !headers.contains("Accept-Ranges")
        && opts.ranges
        && len.is_some_and(|l| l > 0)
        && meta.protocol == Protocol::Http11
    {
        headers.set("Accept-Ranges", "bytes");
    }
    headers.set("Connection", if keep { "keep-alive" } else { "close" });

    if head_only {
        return Emission::Buffer {
            bytes: head_bytes(meta.protocol, line_status, &headers),
            close: !keep,
        };
    }

    if chunking {
        headers.remove("Content-Length");
        headers.set("Transfer-Encoding", "chunked");
        if src {
            return Emission::Stream {
                head: head_bytes(meta.protocol, line_status, &headers),
                body,
                window,
                chunk_size: opts.chunked,
                close: !keep,
            };
        }
        let Body::Bytes(data) = &body else { unreachable!() };
        let mut out = BytesMut::from(&head_bytes(meta.protocol, line_status, &headers)[..]);
        for frame in data.chunks(opts.chunked) {
            out.extend_from_slice(format!("{:x}\r\n", frame.len()).as_bytes());
            out.extend_from_slice(frame);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"0\r\n\r\n");
        return Emission::Buffer {
            bytes: out.freeze(),
            close: !keep,
        };
    }

    if src {
        return Emission::Stream {
            head: head_bytes(meta.protocol, line_status, &headers),
            body,
            window,
            chunk_size: 0,
            close: !keep,
        };
    }
    let Body::Bytes(data) = &body else { unreachable!() };
    let mut out = BytesMut::from(&head_bytes(meta.protocol, line_status, &headers)[..]);
    out.extend_from_slice(data);
    Emission::Buffer {
        bytes: out.freeze(),
        close: !keep,
    }
}

/// Status line plus headers plus the terminating blank line.
fn head_bytes(protocol: Protocol, status: u16, headers: &Headers) -> Bytes {
    let mut out = BytesMut::new();
    out.extend_from_slice(protocol.as_str().as_bytes());
    out.extend_from_slice(b" ");
    out.extend_from_slice(status_text(status).as_bytes());
    out.extend_from_slice(b"\r\n");
    for (k, v) in headers.iter() {
        out.extend_from_slice(k.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(v.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
    out.freeze()
}
