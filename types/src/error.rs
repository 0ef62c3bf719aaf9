//! Error classification shared across crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// How a failure should be treated by whoever observes it.
///
/// Every component error maps into one of these so that callers (a UI, the
/// relay's retry loop, the RPC layer) can decide between retrying now,
/// waiting, or giving up without inspecting individual variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller-supplied input violates a stated constraint. Fix the input.
    Validation,
    /// The caller is not allowed to perform the action.
    Authorization,
    /// The referenced record does not exist.
    NotFound,
    /// An I/O or availability failure that may succeed if retried later.
    Transient,
    /// The process cannot continue.
    Fatal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Authorization => "authorization",
            Self::NotFound => "not_found",
            Self::Transient => "transient",
            Self::Fatal => "fatal",
        }
    }

    /// Whether repeating the same call later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from parsing textual addresses and amounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("amount {value} has more than {max_decimals} decimal places")]
    TooPrecise { value: String, max_decimals: u32 },

    #[error("amount {0} is too large")]
    AmountOverflow(String),
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}
