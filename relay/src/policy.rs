//! Turning a numeric signal into a verification decision.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionPolicy {
    /// Even signals verify, odd signals reject.
    #[default]
    Parity,
    /// Signals at or above `at_least` verify.
    Threshold { at_least: u64 },
    /// Ignore the signal. For local development.
    Constant { verified: bool },
}

impl DecisionPolicy {
    pub fn decide(&self, signal: u64) -> bool {
        match *self {
            Self::Parity => signal % 2 == 0,
            Self::Threshold { at_least } => signal >= at_least,
            Self::Constant { verified } => verified,
        }
    }
}
