//! HTTP API for the fundrelay ledger.
//!
//! Provides endpoints for:
//! - Campaign creation, listing, summaries, and detail pages
//! - Contributions and per-backer history
//! - Verification requests and withdrawals
//! - Provider management and verification submissions
//! - The event log, as a paged history and a WebSocket push feed
//! - Account balances and the development faucet
//! - Prometheus metrics

pub mod error;
pub mod handlers;
pub mod pagination;
pub mod server;
pub mod ws;

pub use error::RpcError;
pub use server::{router, RpcServer, RpcState};
