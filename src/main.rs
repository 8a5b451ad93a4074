use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use pcos_api::server::{router, ServiceContext};
use pcos_api::MODEL_DIR;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    // Fail fast: no artifacts, no server.
    let ctx = ServiceContext::load(Path::new(MODEL_DIR))
        .context("could not load model artifacts; run the `train` binary first")?;
    info!(dir = MODEL_DIR, "model artifacts loaded");

    let app = router(Arc::new(ctx));

    // Optional port as the only CLI argument.
    let port: u16 = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(5000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    let server = axum::serve(listener, app.into_make_service());
    tokio::select! {
        r = server => { r?; }
        _ = tokio::signal::ctrl_c() => { info!("shutdown"); }
    }
    Ok(())
}
