//! Node identity and mesh-wide settings

use crate::error::{NetworkError, Result};
use securemesh_crypto::{EcKeySize, HashAlgorithm, SymmetricKeySize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use uuid::Uuid;

/// Reserved id of the root node
pub const MASTER_ID: &str = "master";

/// Default name of the topology handler
pub const DEFAULT_TOPOLOGY_HANDLER: &str = "topology";

/// Settings every member of one mesh must agree on
#[derive(Clone, PartialEq, Eq)]
pub struct MeshSettings {
    /// Pre-shared authentication secret
    pub secret: String,

    /// Hash used to turn the ECDH secret into a session key
    pub hash_algorithm: HashAlgorithm,

    pub symmetric_key_size: SymmetricKeySize,

    pub ec_key_size: EcKeySize,

    /// Name the topology handler is registered under
    pub topology_handler: String,

    /// Address the listener binds to
    pub bind_address: IpAddr,

    /// Upper bound on sessions handled at once; `None` is unbounded
    pub max_concurrent_sessions: Option<usize>,
}

impl MeshSettings {
    pub fn new(secret: impl Into<String>) -> Self {
        MeshSettings {
            secret: secret.into(),
            hash_algorithm: HashAlgorithm::default(),
            symmetric_key_size: SymmetricKeySize::default(),
            ec_key_size: EcKeySize::default(),
            topology_handler: DEFAULT_TOPOLOGY_HANDLER.to_string(),
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            max_concurrent_sessions: None,
        }
    }

    /// Reject settings under which no session could complete
    pub fn validate(&self) -> Result<()> {
        if self.secret.is_empty() {
            return Err(NetworkError::InvalidSettings(
                "secret must not be empty".to_string(),
            ));
        }
        if self.topology_handler.is_empty() {
            return Err(NetworkError::InvalidSettings(
                "topology handler name is reserved for the fallback handler".to_string(),
            ));
        }
        let digest_len = self.hash_algorithm.output_len();
        let key_len = self.symmetric_key_size.byte_len();
        if digest_len < key_len {
            return Err(NetworkError::InvalidSettings(format!(
                "{} yields {} bytes, {}-bit keys need {}",
                self.hash_algorithm.name(),
                digest_len,
                self.symmetric_key_size.bits(),
                key_len
            )));
        }
        if self.max_concurrent_sessions == Some(0) {
            return Err(NetworkError::InvalidSettings(
                "max_concurrent_sessions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for MeshSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshSettings")
            .field("secret", &"<redacted>")
            .field("hash_algorithm", &self.hash_algorithm)
            .field("symmetric_key_size", &self.symmetric_key_size)
            .field("ec_key_size", &self.ec_key_size)
            .field("topology_handler", &self.topology_handler)
            .field("bind_address", &self.bind_address)
            .field("max_concurrent_sessions", &self.max_concurrent_sessions)
            .finish()
    }
}

/// Who this node is; fixed once the listener is bound
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    id: String,
    port: u16,
    settings: MeshSettings,
}

impl NodeIdentity {
    pub fn new(id: impl Into<String>, port: u16, settings: MeshSettings) -> Self {
        NodeIdentity {
            id: id.into(),
            port,
            settings,
        }
    }

    /// Identity of the root node
    pub fn master(port: u16, settings: MeshSettings) -> Self {
        Self::new(MASTER_ID, port, settings)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Listening port advertised to peers
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn settings(&self) -> &MeshSettings {
        &self.settings
    }

    pub fn secret(&self) -> &str {
        &self.settings.secret
    }

    pub fn is_master(&self) -> bool {
        self.id == MASTER_ID
    }
}

/// Random id for a joining node
pub fn generate_node_id() -> String {
    Uuid::new_v4().simple().to_string()
}
