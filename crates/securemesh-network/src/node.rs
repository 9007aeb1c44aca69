//! Mesh node: listener, accept loop and client operations

use crate::builtin::{PingHandler, PingRequest, TopologyHandler, TopologyRequest, PING_HANDLER};
use crate::error::{NetworkError, Result};
use crate::handler::{Handler, HandlerRegistry};
use crate::handshake;
use crate::identity::{generate_node_id, MeshSettings, NodeIdentity, MASTER_ID};
use crate::peer::{Peer, PeerTable, Topology};
use crate::tcp;
use securemesh_protocol::Wire;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A running mesh member
pub struct Node {
    identity: Arc<NodeIdentity>,
    local_addr: SocketAddr,
    peers: PeerTable,
    handlers: HandlerRegistry,
    /// One outgoing session per peer at a time
    session_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    shutdown_tx: mpsc::Sender<()>,
    accept_task: RwLock<Option<JoinHandle<()>>>,
}

/// State shared by every accepted connection
struct Dispatch {
    identity: Arc<NodeIdentity>,
    peers: PeerTable,
    handlers: HandlerRegistry,
    limiter: Option<Arc<Semaphore>>,
}

impl Node {
    /// Start the root node on `port`
    pub async fn bind(port: u16, settings: MeshSettings) -> Result<Self> {
        Self::start(MASTER_ID.to_string(), port, settings).await
    }

    /// Start a node on an ephemeral port and learn the mesh from a bootstrap
    /// member
    ///
    /// Every peer in the bootstrap node's topology is added without a key.
    /// The bootstrap node itself is stored as `master` with the key from the
    /// discovery session.
    pub async fn join_mesh(
        bootstrap_host: &str,
        bootstrap_port: u16,
        settings: MeshSettings,
    ) -> Result<Self> {
        let node = Self::start(generate_node_id(), 0, settings).await?;

        if let Err(e) = node.bootstrap(bootstrap_host, bootstrap_port).await {
            warn!(
                "Joining via {}:{} failed: {}",
                bootstrap_host, bootstrap_port, e
            );
            node.close().await;
            return Err(e);
        }

        Ok(node)
    }

    async fn start(id: String, port: u16, settings: MeshSettings) -> Result<Self> {
        settings.validate()?;

        let addr = SocketAddr::new(settings.bind_address, port);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| NetworkError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let limiter = settings
            .max_concurrent_sessions
            .map(|n| Arc::new(Semaphore::new(n)));
        let identity = Arc::new(NodeIdentity::new(id, local_addr.port(), settings));
        let peers = PeerTable::new();
        let handlers = HandlerRegistry::new();

        handlers.register(PING_HANDLER, Arc::new(PingHandler)).await;
        handlers
            .register(
                identity.settings().topology_handler.clone(),
                Arc::new(TopologyHandler::new(peers.clone())),
            )
            .await;

        let dispatch = Arc::new(Dispatch {
            identity: Arc::clone(&identity),
            peers: peers.clone(),
            handlers: handlers.clone(),
            limiter,
        });

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let accept_task = tokio::spawn(accept_loop(listener, dispatch, shutdown_rx));

        info!("Node {} listening on {}", identity.id(), local_addr);

        Ok(Node {
            identity,
            local_addr,
            peers,
            handlers,
            session_locks: Mutex::new(HashMap::new()),
            shutdown_tx,
            accept_task: RwLock::new(Some(accept_task)),
        })
    }

    async fn bootstrap(&self, host: &str, port: u16) -> Result<()> {
        let request = TopologyRequest::default();
        let wire = tcp::dial(host, port).await?;
        let key = handshake::initiate(
            wire,
            &self.identity,
            MASTER_ID,
            None,
            &self.identity.settings().topology_handler,
            &request,
        )
        .await?;

        let topology = request
            .take()
            .await
            .ok_or_else(|| NetworkError::Handler("no topology received".to_string()))?;

        let mut imported = 0;
        for (id, address) in topology {
            if id == self.identity.id() {
                continue;
            }
            self.peers
                .upsert(Peer::new(id, address.host, address.port))
                .await;
            imported += 1;
        }
        self.peers
            .upsert(Peer::new(MASTER_ID, host, port).with_key(key))
            .await;

        info!(
            "Joined mesh via {}:{} ({} peers learned)",
            host, port, imported
        );
        Ok(())
    }

    /// Open a session to a known peer and run `handler` on it
    ///
    /// The peer's cached key is offered and the key the session ended with
    /// is written back to the table. Sessions to the same peer run one at a
    /// time.
    pub async fn connect(
        &self,
        peer_id: &str,
        handler_name: &str,
        handler: &dyn Handler,
    ) -> Result<()> {
        let lock = self.session_lock(peer_id).await;
        let _guard = lock.lock().await;

        let mut peer = self
            .peers
            .get(peer_id)
            .await
            .ok_or_else(|| NetworkError::PeerNotFound(peer_id.to_string()))?;

        let result = peer.reconnect(&self.identity, handler_name, handler).await;
        self.peers.update_key(peer_id, peer.key().cloned()).await;
        result
    }

    async fn session_lock(&self, peer_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.session_locks.lock().await;
        Arc::clone(locks.entry(peer_id.to_string()).or_default())
    }

    /// Liveness check against a known peer
    pub async fn ping(&self, peer_id: &str) -> Result<String> {
        let request = PingRequest::default();
        self.connect(peer_id, PING_HANDLER, &request).await?;
        request
            .take()
            .await
            .ok_or_else(|| NetworkError::Handler("no ping reply".to_string()))
    }

    /// Fetch a known peer's view of the mesh
    pub async fn topology(&self, peer_id: &str) -> Result<Topology> {
        let request = TopologyRequest::default();
        let name = self.identity.settings().topology_handler.clone();
        self.connect(peer_id, &name, &request).await?;
        request
            .take()
            .await
            .ok_or_else(|| NetworkError::Handler("no topology received".to_string()))
    }

    /// Register a handler, replacing any handler of the same name
    pub async fn register_handler(&self, name: impl Into<String>, handler: Arc<dyn Handler>) {
        self.handlers.register(name, handler).await;
    }

    pub async fn unregister_handler(&self, name: &str) {
        self.handlers.unregister(name).await;
    }

    pub fn id(&self) -> &str {
        self.identity.id()
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// Stop accepting connections and wait for the accept loop to exit
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn close(&self) {
        let _ = self.shutdown_tx.try_send(());

        if let Some(handle) = self.accept_task.write().await.take() {
            let _ = handle.await;
            info!("Node {} closed", self.identity.id());
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    dispatch: Arc<Dispatch>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Accept loop shutting down");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, remote)) => {
                    tcp::tune(&stream);
                    let dispatch = Arc::clone(&dispatch);
                    tokio::spawn(async move {
                        let _permit = match &dispatch.limiter {
                            Some(limiter) => Some(Arc::clone(limiter).acquire_owned().await),
                            None => None,
                        };

                        let host = remote.ip().to_string();
                        let result = handshake::accept(
                            Wire::boxed(stream),
                            &host,
                            &dispatch.identity,
                            &dispatch.peers,
                            &dispatch.handlers,
                        )
                        .await;

                        match result {
                            Ok(()) => debug!("Session with {} finished", remote),
                            Err(e) => warn!("Connection from {} dropped: {}", remote, e),
                        }
                    });
                }
                Err(e) => warn!("Accept failed: {}", e),
            }
        }
    }
}
