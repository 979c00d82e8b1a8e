use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::http::body::{parse_body, parse_query};
use crate::http::buffer::{Accumulator, SEPARATOR};
use crate::http::parser::{find, parse_headers, parse_request_line};
use crate::http::request::{Attachment, ContentKind, Method, Protocol, Request, RequestMeta};
use crate::http::response::{Reply, error_reply};
use crate::options::Options;
use crate::router::{HandlerFn, Router};

/// Outcome of feeding bytes to the engine.
pub enum Step {
    /// No complete request yet; the caller should read more bytes.
    Pending,
    /// A request parsed and routed; invoke the handler, then encode
    /// its reply. Inbound reads stay suspended until that completes.
    Dispatch {
        meta: RequestMeta,
        request: Request,
        handler: HandlerFn,
    },
    /// A locally answered request (OPTIONS) or a synthesized error.
    Respond { meta: RequestMeta, reply: Reply },
}

/// Completion token captured at dispatch. Streamed response writes
/// re-check it before every write so a stale in-flight stream aborts
/// once the connection closes or advances to a later request.
#[derive(Debug, Clone, Copy)]
pub struct ResponseToken {
    seq: u64,
}

enum Phase {
    Header,
    Body(Box<PendingBody>),
}

/// A POST whose header arrived but whose body is still incomplete.
struct PendingBody {
    request: Request,
    length: u64,
}

/// Per-connection request state machine.
///
/// Consumes arbitrarily chunked inbound bytes, reassembles complete
/// requests across chunk boundaries and resolves routing. Strictly one
/// request in flight: pipelined bytes are retained in the accumulator
/// until [`Engine::step`] is called again after the current response.
pub struct Engine {
    buf: Accumulator,
    phase: Phase,
    router: Arc<Router>,
    opts: Arc<Options>,
    seq: u64,
    open: bool,
    /// Port assumed when neither Host header nor URI carries one.
    fallback_port: u16,
}

impl Engine {
    pub fn new(router: Arc<Router>, opts: Arc<Options>) -> Self {
        Self {
            buf: Accumulator::new(),
            phase: Phase::Header,
            router,
            opts,
            seq: 0,
            open: true,
            fallback_port: 80,
        }
    }

    pub fn set_fallback_port(&mut self, port: u16) {
        self.fallback_port = port;
    }

    /// Sequence number of the most recently dispatched request.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Marks the connection closed; all later pushes are ignored and
    /// outstanding tokens go stale.
    pub fn close(&mut self) {
        self.open = false;
    }

    /// Token for the response currently being written.
    pub fn token(&self) -> ResponseToken {
        ResponseToken { seq: self.seq }
    }

    pub fn is_current(&self, token: &ResponseToken) -> bool {
        self.open && token.seq == self.seq
    }

    /// Feeds one inbound chunk. Rejects with 413 before the
    /// accumulated size can exceed the configured limit; this is the
    /// sole defense against an endless header from a slow peer.
    pub fn push(&mut self, chunk: &[u8]) -> Step {
        if !self.open {
            return Step::Pending;
        }
        if self.buf.len() + chunk.len() > self.opts.limit {
            return Step::Respond {
                meta: RequestMeta::default(),
                reply: error_reply(413, true),
            };
        }
        self.buf.append(chunk);
        self.step()
    }

    /// Re-examines buffered bytes without new input. Called after each
    /// response completes so a pipelined next request gets parsed.
    pub fn step(&mut self) -> Step {
        if !self.open {
            return Step::Pending;
        }
        match &self.phase {
            Phase::Header => self.step_header(),
            Phase::Body(_) => self.step_body(),
        }
    }

    fn step_header(&mut self) -> Step {
        let Some(i) = self.buf.find_separator() else {
            return Step::Pending;
        };
        let head = self.buf.as_slice()[..i].to_vec();
        let consumed = i + SEPARATOR.len();

        // request line / header lines split on the first CRLF; a bare
        // request line with zero header lines is valid HTTP/1.0
        let (line, rest) = match find(&head, b"\r\n") {
            Some(j) => (&head[..j], &head[j + 2..]),
            None => (&head[..], &head[..0]),
        };
        let (method_token, uri, protocol) = match parse_request_line(line) {
            Ok(t) => t,
            Err(_) => {
                self.buf.consume(consumed);
                return self.respond(RequestMeta::default(), 400, true);
            }
        };
        let header = parse_headers(rest);

        let mut meta = RequestMeta {
            protocol,
            method: Method::from_str(&method_token),
            ..RequestMeta::default()
        };
        if header.hostname.is_none() && protocol == Protocol::Http11 {
            self.buf.consume(consumed);
            return self.respond(meta, 400, true);
        }

        let (path, query, uri_host, uri_port) = split_uri(&uri);
        meta.path = path.clone();
        let hostname = header
            .hostname
            .clone()
            .or(uri_host)
            .unwrap_or_else(|| "*".to_string());
        let port = header.port.or(uri_port).unwrap_or(self.fallback_port);

        let Some((host_key, _)) = self.router.resolve_host(&hostname, port) else {
            meta.host = "*".to_string();
            self.buf.consume(consumed);
            return self.respond(meta, 404, true);
        };
        meta.host = host_key.clone();

        let Some(method) = meta.method else {
            self.buf.consume(consumed);
            return self.respond(meta, 405, true);
        };

        let request = Request {
            method,
            uri,
            protocol,
            path,
            query,
            host: host_key,
            hostname,
            port,
            header,
            attach: Attachment::default(),
            seq: 0,
        };

        match method {
            Method::GET | Method::HEAD => {
                self.buf.consume(consumed);
                self.dispatch(request)
            }
            Method::OPTIONS => {
                self.buf.consume(consumed);
                self.options_reply(request)
            }
            Method::POST => self.begin_post(request, consumed),
            Method::PUT | Method::DELETE | Method::TRACE | Method::CONNECT => {
                self.buf.consume(consumed);
                self.respond(RequestMeta::of(&request), 501, true)
            }
        }
    }

    fn begin_post(&mut self, request: Request, consumed: usize) -> Step {
        let meta = RequestMeta::of(&request);
        let length = match request.header.length {
            Some(n) if n > 0 => n,
            _ => {
                self.buf.consume(consumed);
                return self.respond(meta, 411, true);
            }
        };
        if length > self.opts.limit as u64 {
            self.buf.consume(consumed);
            return self.respond(meta, 413, true);
        }
        match request.header.kind {
            Some(ContentKind::UrlEncoded) => {}
            Some(ContentKind::Multipart) if request.header.boundary.is_some() => {}
            _ => {
                self.buf.consume(consumed);
                return self.respond(meta, 400, true);
            }
        }
        self.buf.consume(consumed);
        if (self.buf.len() as u64) >= length {
            let body = self.buf.take(length as usize);
            self.finish_post(request, body)
        } else {
            self.phase = Phase::Body(Box::new(PendingBody { request, length }));
            Step::Pending
        }
    }

    fn step_body(&mut self) -> Step {
        let Phase::Body(pending) = &self.phase else {
            return Step::Pending;
        };
        if (self.buf.len() as u64) < pending.length {
            return Step::Pending;
        }
        let Phase::Body(pending) = std::mem::replace(&mut self.phase, Phase::Header) else {
            unreachable!()
        };
        let body = self.buf.take(pending.length as usize);
        self.finish_post(pending.request, body)
    }

    fn finish_post(&mut self, mut request: Request, body: Bytes) -> Step {
        let kind = request.header.kind.unwrap_or(ContentKind::UrlEncoded);
        request.attach = parse_body(&body, kind, request.header.boundary.as_deref());
        self.dispatch(request)
    }

    /// Routes the completed request and hands it to the caller. The
    /// per-host fallback handler catches unmatched paths; failing
    /// that, the literal 404 page answers.
    fn dispatch(&mut self, mut request: Request) -> Step {
        self.seq += 1;
        request.seq = self.seq;
        let meta = RequestMeta::of(&request);

        // HEAD shares the GET table
        let lookup = if request.method == Method::HEAD {
            Method::GET
        } else {
            request.method
        };
        let handler = self
            .router
            .resolve_host(&request.hostname, request.port)
            .and_then(|(_, routes)| {
                routes
                    .handler(lookup, &request.path)
                    .or_else(|| routes.fallback())
                    .cloned()
            });
        match handler {
            Some(handler) => Step::Dispatch {
                meta,
                request,
                handler,
            },
            None => self.respond(meta, 404, false),
        }
    }

    /// OPTIONS is answered locally: `*` reports the server's supported
    /// method set, a concrete path reports what is registered there.
    fn options_reply(&mut self, request: Request) -> Step {
        let meta = RequestMeta::of(&request);
        let allowed = if request.path == "*" {
            vec!["GET", "HEAD", "POST"]
        } else {
            match self.router.resolve_host(&request.hostname, request.port) {
                Some((_, routes)) => routes.allowed(&request.path),
                None => Vec::new(),
            }
        };
        if allowed.is_empty() {
            return self.respond(meta, 405, false);
        }
        let allow = allowed.join(", ");
        Step::Respond {
            meta,
            reply: Reply::text(allow.clone())
                .header("Content-Type", "text/plain")
                .header("Allow", allow),
        }
    }

    fn respond(&mut self, meta: RequestMeta, status: u16, close: bool) -> Step {
        Step::Respond {
            meta,
            reply: error_reply(status, close),
        }
    }
}

/// Splits a request URI into path, query map and any host/port an
/// absolute-form URI carries.
fn split_uri(
    uri: &str,
) -> (
    String,
    HashMap<String, Vec<String>>,
    Option<String>,
    Option<u16>,
) {
    if uri.contains("://") {
        if let Ok(url) = url::Url::parse(uri) {
            let query = url.query().map(parse_query).unwrap_or_default();
            return (
                url.path().to_string(),
                query,
                url.host_str().map(|h| h.to_lowercase()),
                url.port(),
            );
        }
    }
    match uri.split_once('?') {
        Some((path, q)) => (path.to_string(), parse_query(q), None, None),
        None => (uri.to_string(), HashMap::new(), None, None),
    }
}
