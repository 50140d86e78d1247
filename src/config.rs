//! Process configuration
//!
//! The node identity selects which ledger and wallet files this process
//! operates on. It is resolved once at startup and handed to the router and
//! CLI, never re-read from the environment per request.

use serde::Serialize;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Default mining difficulty (number of leading zero bits)
pub const DEFAULT_DIFFICULTY: u32 = 12;

/// Upper bound on the configurable difficulty
pub const MAX_DIFFICULTY: u32 = 32;

/// Default data directory
pub const DEFAULT_DATA_DIR: &str = ".ledger_data";

/// Default HTTP listen address
pub const DEFAULT_LISTEN_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), 8080));

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid node id {0:?}: use letters, digits, '-' or '_'")]
    InvalidNodeId(String),
    #[error("Invalid difficulty {0}: must be between 1 and {max}", max = MAX_DIFFICULTY)]
    InvalidDifficulty(u32),
}

/// Identifier of the local ledger/wallet instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// The id ends up in file names, so only a conservative charset is accepted
    pub fn new(raw: impl Into<String>) -> Result<Self, ConfigError> {
        let raw = raw.into();
        let well_formed = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if well_formed {
            Ok(Self(raw))
        } else {
            Err(ConfigError::InvalidNodeId(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Gateway configuration, injected into the router at startup
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub node_id: NodeId,
    pub data_dir: PathBuf,
    pub listen_addr: SocketAddr,
    pub difficulty: u32,
}

impl GatewayConfig {
    /// Create a configuration with default listen address and difficulty
    pub fn new(node_id: NodeId, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            node_id,
            data_dir: data_dir.into(),
            listen_addr: DEFAULT_LISTEN_ADDR,
            difficulty: DEFAULT_DIFFICULTY,
        }
    }

    pub fn with_listen_addr(mut self, listen_addr: SocketAddr) -> Self {
        self.listen_addr = listen_addr;
        self
    }

    pub fn with_difficulty(mut self, difficulty: u32) -> Result<Self, ConfigError> {
        if difficulty == 0 || difficulty > MAX_DIFFICULTY {
            return Err(ConfigError::InvalidDifficulty(difficulty));
        }
        self.difficulty = difficulty;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_charset() {
        assert!(NodeId::new("3000").is_ok());
        assert!(NodeId::new("node_a-1").is_ok());
        assert_eq!(
            NodeId::new("../etc"),
            Err(ConfigError::InvalidNodeId("../etc".to_string()))
        );
        assert!(NodeId::new("").is_err());
        assert!("with space".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = GatewayConfig::new(NodeId::new("3000").unwrap(), DEFAULT_DATA_DIR);
        assert_eq!(config.difficulty, DEFAULT_DIFFICULTY);
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(DEFAULT_LISTEN_ADDR.to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_difficulty_bounds() {
        let config = GatewayConfig::new(NodeId::new("3000").unwrap(), DEFAULT_DATA_DIR);
        assert!(config.clone().with_difficulty(0).is_err());
        assert!(config.clone().with_difficulty(33).is_err());
        assert_eq!(config.with_difficulty(4).unwrap().difficulty, 4);
    }
}
