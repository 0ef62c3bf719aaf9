//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use fundrelay_types::{Address, Amount, LedgerParams};
use fundrelay_utils::LogFormat;

use crate::NodeError;

/// An account credited when a fresh ledger is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub account: Address,
    pub amount: Amount,
}

/// Configuration for a ledger node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Interface the RPC server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Port for the RPC server. `0` picks a free port.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Account that deploys the registry and owns the verification authority.
    #[serde(default = "default_owner")]
    pub owner: Address,

    /// Where the ledger state is persisted. In-memory only when unset.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    /// Seconds between periodic snapshots.
    #[serde(default = "default_snapshot_interval_secs")]
    pub snapshot_interval_secs: u64,

    /// Expose `POST /accounts/{addr}/faucet`.
    #[serde(default)]
    pub enable_faucet: bool,

    /// Allowed CORS origins. Any origin when empty.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub params: LedgerParams,

    /// Balances credited at genesis. Ignored when a snapshot is loaded.
    #[serde(default)]
    pub allocations: Vec<Allocation>,
}

fn default_listen_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_port() -> u16 {
    7070
}

fn default_owner() -> Address {
    Address::from_label("fundrelay-owner")
}

fn default_snapshot_interval_secs() -> u64 {
    30
}

fn default_log_format() -> LogFormat {
    LogFormat::Human
}

fn default_log_level() -> String {
    "info".to_string()
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    /// Socket address for the RPC server.
    pub fn rpc_addr(&self) -> Result<SocketAddr, NodeError> {
        format!("{}:{}", self.listen_addr, self.rpc_port)
            .parse()
            .map_err(|e| NodeError::Config(format!("invalid listen address: {e}")))
    }

    /// Settings for local development: dev ledger parameters, the faucet on.
    pub fn dev() -> Self {
        Self {
            params: LedgerParams::dev(),
            enable_faucet: true,
            ..Self::default()
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            rpc_port: default_rpc_port(),
            owner: default_owner(),
            snapshot_path: None,
            snapshot_interval_secs: default_snapshot_interval_secs(),
            enable_faucet: false,
            cors_origins: Vec::new(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            params: LedgerParams::default(),
            allocations: Vec::new(),
        }
    }
}
