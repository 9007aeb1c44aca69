use anyhow::{Context, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use securemesh_crypto::{EcKeySize, HashAlgorithm, SymmetricKeySize};
use securemesh_network::{MeshSettings, DEFAULT_TOPOLOGY_HANDLER};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `mesh.secret`
pub const SECRET_ENV: &str = "MESHNODE_SECRET";

/// Main application configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    pub mesh: MeshConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(skip)]
    config_file_path: PathBuf,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Listening port of a root node
    #[serde(default = "default_port")]
    pub port: u16,

    /// Join an existing mesh through this node instead of acting as root
    #[serde(default)]
    pub bootstrap: Option<BootstrapConfig>,

    pub secret: String,

    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,

    #[serde(default)]
    pub symmetric_key_size: SymmetricKeySize,

    #[serde(default)]
    pub ec_key_size: EcKeySize,

    #[serde(default = "default_topology_handler")]
    pub topology_handler: String,

    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Sessions handled at once; unbounded when absent
    #[serde(default)]
    pub max_concurrent_sessions: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

fn default_port() -> u16 {
    9000
}

fn default_topology_handler() -> String {
    DEFAULT_TOPOLOGY_HANDLER.to_string()
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

impl MeshConfig {
    /// Settings handed to the mesh node
    pub fn settings(&self) -> MeshSettings {
        MeshSettings {
            secret: self.secret.clone(),
            hash_algorithm: self.hash_algorithm,
            symmetric_key_size: self.symmetric_key_size,
            ec_key_size: self.ec_key_size,
            topology_handler: self.topology_handler.clone(),
            bind_address: self.bind_address,
            max_concurrent_sessions: self.max_concurrent_sessions,
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// `MESHNODE_SECRET`, when set, replaces the secret from the file.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = config_path.unwrap_or_else(Self::default_config_path);

        if !config_path.exists() {
            anyhow::bail!(
                "Configuration file not found: {}\nRun with --init to create a new configuration",
                config_path.display()
            );
        }

        let contents =
            fs::read_to_string(&config_path).context("Failed to read configuration file")?;
        let mut config = Self::from_yaml(&contents)?;
        config.apply_secret_override(std::env::var(SECRET_ENV).ok());
        config.validate()?;
        config.config_file_path = config_path;

        Ok(config)
    }

    /// Parse configuration without touching the file system
    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).context("Failed to parse configuration file")
    }

    /// Create a new default configuration with a random secret
    pub fn create_default(config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = config_path.unwrap_or_else(Self::default_config_path);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        securemesh_crypto::init()?;

        let mut secret = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut secret)
            .context("Failed to generate mesh secret")?;

        let config = Config {
            mesh: MeshConfig {
                port: default_port(),
                bootstrap: None,
                secret: hex::encode(secret),
                hash_algorithm: HashAlgorithm::default(),
                symmetric_key_size: SymmetricKeySize::default(),
                ec_key_size: EcKeySize::default(),
                topology_handler: default_topology_handler(),
                bind_address: default_bind_address(),
                max_concurrent_sessions: None,
            },
            logging: LoggingConfig::default(),
            config_file_path: config_path.clone(),
        };

        let yaml = serde_yaml::to_string(&config)?;
        fs::write(&config_path, yaml)?;

        Ok(config)
    }

    pub fn apply_secret_override(&mut self, secret: Option<String>) {
        if let Some(secret) = secret {
            self.mesh.secret = secret;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.mesh
            .settings()
            .validate()
            .context("Invalid mesh configuration")?;
        if let Some(bootstrap) = &self.mesh.bootstrap {
            if bootstrap.host.is_empty() {
                anyhow::bail!("mesh.bootstrap.host must not be empty");
            }
        }
        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_file_path
    }

    fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("meshnode")
            .join("config.yaml")
    }
}
