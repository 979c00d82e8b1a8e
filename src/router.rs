use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::http::request::{Method, Request};
use crate::http::response::Reply;

/// A route handler: consumes the parsed request, returns the reply.
///
/// The returned future may resolve immediately or after arbitrary
/// delay; the engine suspends inbound reads until it does.
pub type HandlerFn =
    Arc<dyn Fn(Request) -> Pin<Box<dyn Future<Output = Reply> + Send>> + Send + Sync>;

/// Wraps an async closure into a [`HandlerFn`].
pub fn handler<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Reply> + Send + 'static,
{
    Arc::new(move |req| Box::pin(f(req)))
}

/// Per-host routes: exact path tables per method, plus an optional
/// fallback handler that catches every unmatched path on that host.
#[derive(Default)]
pub struct HostRoutes {
    methods: HashMap<Method, HashMap<String, HandlerFn>>,
    fallback: Option<HandlerFn>,
}

impl HostRoutes {
    /// Exact-path handler for the method, without the fallback.
    pub fn handler(&self, method: Method, path: &str) -> Option<&HandlerFn> {
        self.methods.get(&method).and_then(|m| m.get(path))
    }

    pub fn fallback(&self) -> Option<&HandlerFn> {
        self.fallback.as_ref()
    }

    /// Methods answered for an exact path, for OPTIONS responses.
    /// HEAD piggybacks on GET. A fallback handler answers everything.
    pub fn allowed(&self, path: &str) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.fallback.is_some() {
            out.extend(["GET", "HEAD", "POST"]);
        } else {
            if self.handler(Method::GET, path).is_some() {
                out.extend(["GET", "HEAD"]);
            }
            if self.handler(Method::POST, path).is_some() {
                out.push("POST");
            }
        }
        out
    }
}

/// Route table: host key -> method -> exact path -> handler.
///
/// Host keys are matched in precedence order `hostname:port`,
/// `hostname`, `*:port`, `*`.
#[derive(Default)]
pub struct Router {
    hosts: HashMap<String, HostRoutes>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for an exact path under a host key.
    pub fn route(&mut self, host: &str, method: Method, path: &str, h: HandlerFn) -> &mut Self {
        self.hosts
            .entry(host.to_string())
            .or_default()
            .methods
            .entry(method)
            .or_default()
            .insert(path.to_string(), h);
        self
    }

    /// Registers the per-host fallback invoked when no path matches.
    pub fn fallback(&mut self, host: &str, h: HandlerFn) -> &mut Self {
        self.hosts.entry(host.to_string()).or_default().fallback = Some(h);
        self
    }

    /// Resolves a hostname/port pair to the best-matching host entry,
    /// returning the key that matched.
    pub fn resolve_host(&self, hostname: &str, port: u16) -> Option<(String, &HostRoutes)> {
        for key in [
            format!("{hostname}:{port}"),
            hostname.to_string(),
            format!("*:{port}"),
            "*".to_string(),
        ] {
            if let Some(routes) = self.hosts.get(&key) {
                return Some((key, routes));
            }
        }
        None
    }
}
