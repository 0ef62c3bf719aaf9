//! Fundamental types for fundrelay.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! addresses, fixed-point amounts, timestamps and clocks, ledger parameters, and the
//! error classification every component error maps into.

pub mod address;
pub mod amount;
pub mod error;
pub mod params;
pub mod time;

pub use address::Address;
pub use amount::Amount;
pub use error::{ErrorKind, ParseError};
pub use params::LedgerParams;
pub use time::{Clock, SystemClock, Timestamp};
