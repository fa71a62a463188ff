use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use reverb_core::{load_config, MemoryCache, ReverbConfig, SystemClock};
use reverb_service::{EchoService, RandomIndicator};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("Reverb echo service starting...");

    let config = match std::env::args().nth(1) {
        Some(path) => load_config(Path::new(&path))?,
        None => ReverbConfig::default(),
    };
    let addr: SocketAddr = config.server.bind_addr.parse()?;

    let service = Arc::new(
        EchoService::new(
            Arc::new(MemoryCache::new()),
            Arc::new(SystemClock),
            Arc::new(RandomIndicator),
            config.cache.op_timeout(),
        )
        .await,
    );

    let gateway = tokio::spawn(reverb_gateway_http::serve(addr, Arc::clone(&service)));
    tracing::info!("Reverb initialized. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    gateway.abort();

    Ok(())
}
