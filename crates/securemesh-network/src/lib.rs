//! SecureMesh Network Layer
//!
//! One-hop authenticated transport between mesh members:
//! - Node identity and shared mesh settings
//! - Peer table with cached per-peer session keys
//! - Connection handshake (key reuse or ECDH negotiation, secret check)
//! - Named handler dispatch with an `""` fallback
//! - Built-in `ping` and topology handlers

pub mod builtin;
pub mod error;
pub mod handler;
pub mod handshake;
pub mod identity;
pub mod node;
pub mod peer;
pub mod tcp;

pub use builtin::{PingHandler, PingRequest, TopologyHandler, TopologyRequest, PING_HANDLER, PING_REPLY};
pub use error::{NetworkError, Result};
pub use handler::{Handler, HandlerRegistry, FALLBACK_HANDLER};
pub use identity::{generate_node_id, MeshSettings, NodeIdentity, DEFAULT_TOPOLOGY_HANDLER, MASTER_ID};
pub use node::Node;
pub use peer::{Peer, PeerAddress, PeerTable, Topology};
