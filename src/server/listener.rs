//! TCP transport glue: accepts sockets and runs one [`Connection`]
//! task per peer. The engine itself is transport-agnostic; this is the
//! thin collaborator a host application would typically replace.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::diag::Diagnostics;
use crate::http::connection::Connection;
use crate::options::Options;
use crate::router::Router;

pub async fn run(
    addr: &str,
    router: Arc<Router>,
    opts: Arc<Options>,
    diag: Diagnostics,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!("Listening on {}", local);

    loop {
        let (socket, peer) = listener.accept().await?;
        info!("Accepted connection from {}", peer);

        let (router, opts, diag) = (router.clone(), opts.clone(), diag.clone());
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, router, opts)
                .with_diagnostics(diag)
                .with_fallback_port(local.port());
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
