//! Ledger transaction layer.
//!
//! [`Chain`] owns the registry, the verification authority, account balances
//! and the event log, and applies each transaction atomically: a transaction
//! either returns a [`Receipt`] with every event it appended, or an error and
//! no change at all. [`SharedChain`] wraps it for concurrent async access and
//! fans appended events out to subscribers.

pub mod chain;
pub mod error;
pub mod receipt;
pub mod shared;
pub mod state;

pub use chain::Chain;
pub use error::ChainError;
pub use receipt::Receipt;
pub use shared::SharedChain;
pub use state::LedgerState;
