use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::Config;

use securemesh_network::Node;

/// Runs one mesh node until asked to stop
pub struct MeshNode {
    node: Node,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl MeshNode {
    /// Bind the node, joining through the bootstrap node when one is configured
    pub async fn start(config: &Config) -> Result<Self> {
        let settings = config.mesh.settings();

        let node = match &config.mesh.bootstrap {
            Some(bootstrap) => {
                info!("Joining mesh via {}:{}...", bootstrap.host, bootstrap.port);
                Node::join_mesh(&bootstrap.host, bootstrap.port, settings)
                    .await
                    .with_context(|| {
                        format!(
                            "Failed to join mesh via {}:{}",
                            bootstrap.host, bootstrap.port
                        )
                    })?
            }
            None => {
                info!("Starting root node on port {}...", config.mesh.port);
                Node::bind(config.mesh.port, settings)
                    .await
                    .context("Failed to start root node")?
            }
        };

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        Ok(Self {
            node,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let identity = self.node.identity();
        let settings = identity.settings();

        info!("═══════════════════════════════════════════════");
        info!("  MeshNode is now running");
        info!("═══════════════════════════════════════════════");
        info!("  Node ID: {}", identity.id());
        info!("  Listening: {}", self.node.local_addr());
        info!("  Hash: {}", settings.hash_algorithm);
        info!(
            "  Keys: {} symmetric, {} EC",
            settings.symmetric_key_size, settings.ec_key_size
        );
        info!("  Known peers: {}", self.node.peers().len().await);
        info!("═══════════════════════════════════════════════");

        self.wait_for_shutdown().await;

        info!("Shutting down MeshNode...");
        self.node.close().await;
        info!("Shutdown complete");

        Ok(())
    }

    async fn wait_for_shutdown(&mut self) {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C signal");
            }
            _ = self.shutdown_rx.recv() => {
                info!("Received shutdown signal");
            }
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn shutdown_handle(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }
}
