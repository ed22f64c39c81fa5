use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use peerbridge::app::plugin::NativePlugin;
use peerbridge::app::App;
use peerbridge::router::RouterEvent;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "peerbridge.yaml".to_string());

    let config = peerbridge::config::load_config(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.level)),
        )
        .init();

    info!(path = %config_path, "config loaded");

    let app = App::new(config, Arc::new(NativePlugin))?;

    let shutdown = app.shutdown_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.trigger("ctrl-c");
        }
    });

    app.run(|event| match event {
        RouterEvent::PeerCreated { peer_id, .. } => info!(peer_id = %peer_id, "peer ready"),
    })
    .await?;

    Ok(())
}
