//! Contribution records.

use fundrelay_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};

/// A single accepted contribution. Append-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub backer: Address,
    pub amount: Amount,
    pub timestamp: Timestamp,
}

impl Contribution {
    pub fn new(backer: Address, amount: Amount, timestamp: Timestamp) -> Self {
        Self {
            backer,
            amount,
            timestamp,
        }
    }
}
