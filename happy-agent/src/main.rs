use anyhow::{Context, Result};
use happy_agent::{logging, supervise, Bootstrap, Config, Startup, DEFAULT_CONFIG_FILE};
use happy_offline::OfflineState;
use happy_reconnect::ReconnectionState;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    logging::init(&config.log_level);

    let offline = Arc::new(OfflineState::new());
    let bootstrap = Bootstrap::from_config(&config, Arc::clone(&offline));

    let handle = match bootstrap.start(&config).await {
        Startup::Online(session) => {
            println!(
                "✓ Connected to {} at {}",
                session.server_url,
                session.connected_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            return Ok(());
        }
        Startup::Offline(handle) => handle,
    };

    println!("📴 Working offline. Reconnecting to {} in the background.", config.server_url);

    let state = tokio::select! {
        state = supervise(&handle, &offline) => state,
        _ = tokio::signal::ctrl_c() => {
            handle.cancel();
            offline.flush();
            ReconnectionState::Cancelled
        }
    };

    match state {
        ReconnectionState::AuthFailed => anyhow::bail!("Authentication failed"),
        ReconnectionState::Cancelled => println!("Reconnection cancelled"),
        _ => {}
    }
    Ok(())
}
