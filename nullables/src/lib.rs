//! Nullable infrastructure for deterministic testing.
//!
//! Everything the ledger and the relay touch outside themselves (the clock,
//! the external data source, the ledger as seen by the relay, the event feed)
//! sits behind a trait. The doubles here:
//! - return scripted values,
//! - record the calls made on them for assertions,
//! - never touch the network.
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod data_source;
pub mod event_source;
pub mod ledger_client;

pub use clock::NullClock;
pub use data_source::NullDataSource;
pub use event_source::{NullEventFeed, NullEventSource};
pub use ledger_client::NullLedgerClient;
