use std::io::SeekFrom;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt};

use crate::diag::Diagnostics;
use crate::http::engine::{Engine, ResponseToken, Step};
use crate::http::range::Window;
use crate::http::request::RequestMeta;
use crate::http::response::{Body, Reply, error_reply};
use crate::http::writer::{Emission, encode};
use crate::options::Options;
use crate::router::Router;

const READ_BUF: usize = 8192;
const COPY_BUF: usize = 64 * 1024;

/// Drives one [`Engine`] over a duplex byte channel.
///
/// Works over anything `AsyncRead + AsyncWrite` (TCP, TLS, an
/// in-memory duplex in tests). Strictly sequential per connection:
/// inbound reads are suspended from dispatch until the response is
/// fully written, which is what bounds memory against a flooding peer.
pub struct Connection<S> {
    stream: S,
    engine: Engine,
    opts: Arc<Options>,
    diag: Diagnostics,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    pub fn new(stream: S, router: Arc<Router>, opts: Arc<Options>) -> Self {
        let engine = Engine::new(router, opts.clone());
        Self {
            stream,
            engine,
            opts,
            diag: Diagnostics::new(),
        }
    }

    /// Subscribes a diagnostic sink (all >= 400 responses, 416s and
    /// stream failures).
    pub fn with_diagnostics(mut self, diag: Diagnostics) -> Self {
        self.diag = diag;
        self
    }

    /// Port used for host-key resolution when the request itself
    /// carries none.
    pub fn with_fallback_port(mut self, port: u16) -> Self {
        self.engine.set_fallback_port(port);
        self
    }

    /// Runs the connection to completion: peer close, engine-decided
    /// close, or I/O error.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut buf = [0u8; READ_BUF];
        loop {
            // drain buffered (pipelined) requests before reading
            match self.engine.step() {
                Step::Pending => {
                    let n = self.stream.read(&mut buf).await?;
                    if n == 0 {
                        self.engine.close();
                        return Ok(());
                    }
                    let step = self.engine.push(&buf[..n]);
                    if !self.handle(step).await? {
                        return Ok(());
                    }
                }
                step => {
                    if !self.handle(step).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Returns `false` once the connection is finished.
    async fn handle(&mut self, step: Step) -> anyhow::Result<bool> {
        match step {
            Step::Pending => Ok(true),
            Step::Respond { meta, reply } => self.respond(meta, reply).await,
            Step::Dispatch {
                meta,
                request,
                handler,
            } => {
                // no reads happen while the handler runs; the peer is
                // backpressured by the transport until we resume
                let reply = handler(request).await;
                self.respond(meta, reply).await
            }
        }
    }

    async fn respond(&mut self, meta: RequestMeta, mut reply: Reply) -> anyhow::Result<bool> {
        if let Body::File { path, len } = &mut reply.body {
            if len.is_none() {
                // resolve the length before framing decisions
                let trimmed = path.to_string_lossy().trim().to_string();
                if trimmed == "." || trimmed == ".." || trimmed.is_empty() {
                    reply = error_reply(404, false);
                } else {
                    match tokio::fs::metadata(&trimmed).await {
                        Ok(md) => {
                            *path = trimmed.into();
                            *len = Some(md.len());
                            if self.opts.cache && !reply.headers.contains("Last-Modified") {
                                let mtime = md.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                                reply
                                    .headers
                                    .set("Last-Modified", httpdate::fmt_http_date(mtime));
                            }
                        }
                        Err(e) => {
                            self.diag.emit(404, format!("{e} {}", meta.describe()));
                            reply = error_reply(404, false);
                        }
                    }
                }
            }
        }

        let token = self.engine.token();
        match encode(&meta, reply, &self.opts, &self.diag) {
            Emission::Buffer { bytes, close } => {
                self.stream.write_all(&bytes).await?;
                self.finish(close).await
            }
            Emission::Stream {
                head,
                body,
                window,
                chunk_size,
                close,
            } => {
                self.stream.write_all(&head).await?;
                match self.pump(body, window, chunk_size, token).await {
                    Ok(()) => self.finish(close).await,
                    Err(e) => {
                        // headers are on the wire; nothing left but to drop the link
                        self.diag.emit(500, format!("{e} {}", meta.describe()));
                        self.finish(true).await
                    }
                }
            }
        }
    }

    async fn finish(&mut self, close: bool) -> anyhow::Result<bool> {
        self.stream.flush().await?;
        if close {
            self.engine.close();
            self.stream.shutdown().await.ok();
            Ok(false)
        } else {
            Ok(true)
        }
    }

    /// Pipes a byte source to the peer, optionally windowed to a 206
    /// range and optionally framed as chunked encoding.
    async fn pump(
        &mut self,
        body: Body,
        window: Option<Window>,
        chunk_size: usize,
        token: ResponseToken,
    ) -> std::io::Result<()> {
        match body {
            Body::File { path, .. } => {
                let mut file = tokio::fs::File::open(&path).await?;
                let remaining = match window {
                    Some((start, end)) => {
                        file.seek(SeekFrom::Start(start)).await?;
                        Some(end - start)
                    }
                    None => None,
                };
                self.copy_source(&mut file, remaining, chunk_size, token)
                    .await
            }
            Body::Stream { mut source, .. } => {
                let remaining = match window {
                    Some((start, end)) => {
                        discard(&mut source, start).await?;
                        Some(end - start)
                    }
                    None => None,
                };
                self.copy_source(&mut source, remaining, chunk_size, token)
                    .await
            }
            // in-memory bodies never produce a Stream emission
            Body::Bytes(_) | Body::Text(_) => Ok(()),
        }
    }

    async fn copy_source<R: AsyncRead + Unpin + ?Sized>(
        &mut self,
        source: &mut R,
        mut remaining: Option<u64>,
        chunk_size: usize,
        token: ResponseToken,
    ) -> std::io::Result<()> {
        let cap = if chunk_size > 0 {
            COPY_BUF.min(chunk_size)
        } else {
            COPY_BUF
        };
        let mut buf = vec![0u8; cap];
        loop {
            if remaining == Some(0) {
                break;
            }
            // a stale token means the connection closed or advanced
            // past this response while the source was still flowing
            if !self.engine.is_current(&token) {
                return Ok(());
            }
            let cap = remaining.map_or(buf.len(), |r| (r as usize).min(buf.len()));
            let n = source.read(&mut buf[..cap]).await?;
            if n == 0 {
                break;
            }
            if let Some(r) = &mut remaining {
                *r -= n as u64;
            }
            if !self.engine.is_current(&token) {
                return Ok(());
            }
            if chunk_size > 0 {
                self.stream
                    .write_all(format!("{n:x}\r\n").as_bytes())
                    .await?;
                self.stream.write_all(&buf[..n]).await?;
                self.stream.write_all(b"\r\n").await?;
            } else {
                self.stream.write_all(&buf[..n]).await?;
            }
        }
        if chunk_size > 0 && self.engine.is_current(&token) {
            self.stream.write_all(b"0\r\n\r\n").await?;
        }
        Ok(())
    }
}

/// Reads and drops `n` bytes from an unseekable source (the prefix of
/// a range window).
async fn discard<R: AsyncRead + Unpin + ?Sized>(source: &mut R, mut n: u64) -> std::io::Result<()> {
    let mut sink = [0u8; READ_BUF];
    while n > 0 {
        let cap = (n as usize).min(sink.len());
        let got = source.read(&mut sink[..cap]).await?;
        if got == 0 {
            break;
        }
        n -= got as u64;
    }
    Ok(())
}
