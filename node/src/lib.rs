//! fundrelay ledger node.
//!
//! Hosts the shared ledger for one deployment: loads or creates the state,
//! serves the RPC API, keeps Prometheus metrics and writes periodic JSON
//! snapshots until shutdown.

pub mod config;
pub mod error;
pub mod metrics;
pub mod node;
pub mod snapshot;

pub use config::{Allocation, NodeConfig};
pub use error::NodeError;
pub use metrics::NodeMetrics;
pub use node::LedgerNode;
pub use snapshot::{load_snapshot, save_snapshot};
