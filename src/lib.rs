//! httpstream - embeddable HTTP/1.0-1.1 protocol engine.
//!
//! Core library: the [`http`] module holds the protocol state machine
//! and codecs, [`router`] the host/method/path dispatch table,
//! [`diag`] the diagnostic event channel and [`server`] the TCP glue.

pub mod diag;
pub mod http;
pub mod options;
pub mod router;
pub mod server;

pub use diag::{Diagnostic, Diagnostics};
pub use http::connection::Connection;
pub use http::engine::{Engine, Step};
pub use http::request::{Attachment, Method, Protocol, Request};
pub use http::response::{Body, Reply};
pub use options::Options;
pub use router::{HandlerFn, Router, handler};
