//! Nova Arena Server
//!
//! Binary entry point: loads configuration, initializes logging, and
//! runs the game server until shutdown.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nova_arena::{GameServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            ServerConfig::from_file(&path).with_context(|| format!("loading config {path}"))?
        }
        None => ServerConfig::default(),
    };

    info!("Nova Arena Server v{VERSION}");
    info!(
        tick_rate = config.tick_rate,
        world = format!("{}x{}", config.world_width, config.world_height),
        "starting"
    );

    let server = GameServer::new(config);
    server.run().await.context("server terminated")?;
    Ok(())
}
