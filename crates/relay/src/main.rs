use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 5000;

fn get_port() -> u16 {
    std::env::var("STOCKCART_RELAY_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,stockcart_relay=info,tower_http=info".into()),
        )
        .init();

    let catalogue = match std::env::var("STOCKCART_SEED").ok().map(PathBuf::from) {
        Some(path) => stockcart_relay::seed::load(&path)?,
        None => stockcart_relay::seed::demo_catalogue(),
    };
    info!(movements = catalogue.len(), "catalogue loaded");

    let state = stockcart_relay::state::RelayState::new(catalogue);
    let app = stockcart_relay::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], get_port()));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Relay listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
