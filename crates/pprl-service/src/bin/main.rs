//! pprl-service binary
//!
//! Usage:
//!   pprl-service [port]
//!
//! Binds 0.0.0.0 on the given port (default 8000) and serves the
//! transform, mask and match endpoints.

use std::net::SocketAddr;

use tokio::net::TcpListener;

use pprl_service::create_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let port: u16 = std::env::args()
        .nth(1)
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or(8000);

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    tracing::info!("starting PPRL service on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, create_router()).await?;

    Ok(())
}
