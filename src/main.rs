use std::sync::Arc;

use httpstream::{Diagnostics, Method, Options, Reply, Router, handler, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let addr = std::env::var("LISTEN").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let opts = match std::env::var("CONFIG") {
        Ok(path) => Options::from_yaml(&std::fs::read_to_string(path)?)?,
        Err(_) => Options::default(),
    };

    let mut router = Router::new();
    router.route(
        "*",
        Method::GET,
        "/",
        handler(|_req| async { Reply::text("<h1>httpstream</h1>") }),
    );
    router.route(
        "*",
        Method::POST,
        "/echo",
        handler(|req| async move {
            let fields = req
                .attach
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", k, v.join(",")))
                .collect::<Vec<_>>()
                .join("\n");
            Reply::text(fields).header("Content-Type", "text/plain")
        }),
    );

    let (diag, mut errors) = Diagnostics::channel();
    tokio::spawn(async move {
        while let Some(e) = errors.recv().await {
            tracing::warn!(status = e.status, "{}", e.context);
        }
    });

    tokio::select! {
        res = server::run(&addr, Arc::new(router), Arc::new(opts), diag) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
