//! The seam between the authority and whatever it verifies.

use fundrelay_ledger::LedgerEvent;
use fundrelay_types::{Address, Timestamp};

/// Result of recording a verification result on a target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The milestone was unverified; its flag is now `verified`.
    Recorded { verified: bool, event: LedgerEvent },
    /// The milestone was already verified; nothing changed.
    AlreadyVerified,
}

impl RecordOutcome {
    pub fn changed_state(&self) -> bool {
        matches!(self, Self::Recorded { .. })
    }
}

/// Something whose milestones the authority can vouch for.
pub trait VerificationTarget {
    type Error: std::error::Error + 'static;

    /// The target's own ledger address.
    fn target_address(&self) -> Address;

    /// Record a verification result. `caller` is the account invoking the
    /// target, which must be the target's configured authority.
    fn record_verification_result(
        &mut self,
        caller: &Address,
        milestone_index: usize,
        result: bool,
        now: Timestamp,
    ) -> Result<RecordOutcome, Self::Error>;
}
