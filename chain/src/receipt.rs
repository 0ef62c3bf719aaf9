use fundrelay_ledger::LoggedEvent;
use serde::{Deserialize, Serialize};

/// Proof that a transaction was applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Sequence of the first event the transaction appended, or the next free
    /// sequence if it appended none.
    pub sequence: u64,
    pub events: Vec<LoggedEvent>,
}

impl Receipt {
    pub fn empty(next_sequence: u64) -> Self {
        Self {
            sequence: next_sequence,
            events: Vec::new(),
        }
    }

    pub fn single(event: LoggedEvent) -> Self {
        Self {
            sequence: event.sequence,
            events: vec![event],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
