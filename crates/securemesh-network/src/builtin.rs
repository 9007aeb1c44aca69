//! Handlers every node registers, and their initiating counterparts

use crate::error::Result;
use crate::handler::Handler;
use crate::peer::{PeerTable, Topology};
use async_trait::async_trait;
use securemesh_protocol::Session;
use tokio::sync::Mutex;

/// Name of the liveness handler
pub const PING_HANDLER: &str = "ping";

/// Reply sent by the liveness handler
pub const PING_REPLY: &str = "pong";

/// Answers every session with [`PING_REPLY`]
pub struct PingHandler;

#[async_trait]
impl Handler for PingHandler {
    async fn handle(&self, session: &mut Session) -> Result<()> {
        session.write(PING_REPLY).await?;
        Ok(())
    }
}

/// Sends a snapshot of the local peer table
pub struct TopologyHandler {
    peers: PeerTable,
}

impl TopologyHandler {
    pub fn new(peers: PeerTable) -> Self {
        TopologyHandler { peers }
    }
}

#[async_trait]
impl Handler for TopologyHandler {
    async fn handle(&self, session: &mut Session) -> Result<()> {
        let snapshot = self.peers.snapshot().await;
        session.write(&snapshot).await?;
        Ok(())
    }
}

/// Reads the reply of a [`PingHandler`]
#[derive(Default)]
pub struct PingRequest {
    reply: Mutex<Option<String>>,
}

impl PingRequest {
    pub async fn take(&self) -> Option<String> {
        self.reply.lock().await.take()
    }
}

#[async_trait]
impl Handler for PingRequest {
    async fn handle(&self, session: &mut Session) -> Result<()> {
        let reply: String = session.read().await?;
        *self.reply.lock().await = Some(reply);
        Ok(())
    }
}

/// Reads the snapshot sent by a [`TopologyHandler`]
#[derive(Default)]
pub struct TopologyRequest {
    topology: Mutex<Option<Topology>>,
}

impl TopologyRequest {
    pub async fn take(&self) -> Option<Topology> {
        self.topology.lock().await.take()
    }
}

#[async_trait]
impl Handler for TopologyRequest {
    async fn handle(&self, session: &mut Session) -> Result<()> {
        let topology: Topology = session.read().await?;
        *self.topology.lock().await = Some(topology);
        Ok(())
    }
}
