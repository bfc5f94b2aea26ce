//! # Block Node
//!
//! Binary entry point.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from `BN_*` environment variables
//! 2. Initialize logging
//! 3. Build and wire the subsystems
//! 4. Run until Ctrl+C or a pipeline failure stops the listener

use anyhow::{Context, Result};
use bn_telemetry::init_logging;
use node_runtime::{BlockNode, NodeConfig};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env().context("Failed to load configuration")?;
    init_logging(&config.telemetry).context("Failed to initialize logging")?;

    info!("===========================================");
    info!("  Block Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let node = BlockNode::start(config)
        .await
        .context("Failed to start block node")?;
    info!(
        root = ?node.config().persistence.root_path,
        next_block = node.next_block_number(),
        "Node is running. Press Ctrl+C to stop."
    );

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            info!("Interrupt received");
        }
        _ = node.stopped() => {
            warn!("Listener stopped after a pipeline failure");
        }
    }

    node.shutdown().await;
    match node.metrics().encode_text() {
        Ok(text) => debug!(metrics = %text, "Final metrics"),
        Err(e) => warn!(error = %e, "Could not encode metrics"),
    }
    info!("Shutdown complete");
    Ok(())
}
