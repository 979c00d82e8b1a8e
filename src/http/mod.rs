//! HTTP protocol implementation.
//!
//! Sits between a raw duplex byte channel and application route
//! handlers: incrementally decodes inbound bytes into requests and
//! encodes handler replies back into well-formed responses, including
//! range requests, chunked transfer encoding, `ETag`/`Last-Modified`
//! negotiation and streamed file bodies.
//!
//! # Architecture
//!
//! - **`buffer`**: per-connection accumulator for unconsumed inbound bytes
//! - **`parser`**: request line and typed header-view decoding
//! - **`request`**: parsed request representation handed to handlers
//! - **`body`**: `multipart/form-data` and urlencoded body decoding
//! - **`engine`**: the per-connection request state machine
//! - **`response`**: handler reply representation and status registry
//! - **`range`**: `Range: bytes=` grammar and `ETag` computation
//! - **`writer`**: response encoder (cache, ranges, chunking, framing)
//! - **`connection`**: drives an engine over any `AsyncRead + AsyncWrite`
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌────────────────┐
//!        │ AwaitingHeader │ ← accumulate until CRLF-CRLF
//!        └───────┬────────┘
//!                │ header complete
//!        GET/HEAD/OPTIONS          POST with body pending
//!                │                         │
//!                ▼                         ▼
//!        ┌──────────────┐         ┌──────────────┐
//!        │  Dispatching │ ◄───────│ AwaitingBody │ ← accumulate
//!        └───────┬──────┘  body   └──────────────┘   Content-Length bytes
//!                │ response fully written
//!                ├─ keep-alive → AwaitingHeader (same connection)
//!                └─ close → Closed
//! ```
//!
//! Inbound reads are suspended between dispatch and response
//! completion, so at most one request is in flight per connection and
//! responses always go out in request order.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use httpstream::{Connection, Options, Router, Method, Reply, handler};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut router = Router::new();
//!     router.route("*", Method::GET, "/", handler(|_req| async {
//!         Reply::text("hello")
//!     }));
//!     let router = Arc::new(router);
//!     let opts = Arc::new(Options::default());
//!
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     loop {
//!         let (socket, _peer) = listener.accept().await?;
//!         let (router, opts) = (router.clone(), opts.clone());
//!         tokio::spawn(async move {
//!             let mut conn = Connection::new(socket, router, opts)
//!                 .with_fallback_port(8080);
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod body;
pub mod buffer;
pub mod connection;
pub mod engine;
pub mod parser;
pub mod range;
pub mod request;
pub mod response;
pub mod writer;

pub use connection::Connection;
pub use engine::{Engine, Step};
pub use request::{Attachment, Method, Protocol, Request};
pub use response::{Body, Reply};
