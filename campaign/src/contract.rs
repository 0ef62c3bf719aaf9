//! A campaign record bound to an engine.

use crate::context::CallContext;
use crate::engine::{CampaignEngine, Withdrawal};
use crate::error::CampaignError;
use fundrelay_authority::{RecordOutcome, VerificationTarget};
use fundrelay_ledger::{Campaign, LedgerEvent};
use fundrelay_types::{Address, Amount, Timestamp};

/// Mutable handle over one campaign. This is what the verification
/// authority forwards submissions to.
pub struct CampaignContract<'a> {
    engine: &'a CampaignEngine,
    campaign: &'a mut Campaign,
}

impl<'a> CampaignContract<'a> {
    pub fn new(engine: &'a CampaignEngine, campaign: &'a mut Campaign) -> Self {
        Self { engine, campaign }
    }

    pub fn campaign(&self) -> &Campaign {
        self.campaign
    }

    pub fn contribute(&mut self, ctx: &CallContext, amount: Amount) -> Result<LedgerEvent, CampaignError> {
        self.engine.contribute(self.campaign, ctx, amount)
    }

    pub fn request_verification(
        &mut self,
        ctx: &CallContext,
        index: usize,
    ) -> Result<LedgerEvent, CampaignError> {
        self.engine.request_verification(self.campaign, ctx, index)
    }

    pub fn withdraw(&mut self, ctx: &CallContext, index: usize) -> Result<Withdrawal, CampaignError> {
        self.engine.withdraw(self.campaign, ctx, index)
    }
}

impl VerificationTarget for CampaignContract<'_> {
    type Error = CampaignError;

    fn target_address(&self) -> Address {
        self.campaign.address
    }

    fn record_verification_result(
        &mut self,
        caller: &Address,
        milestone_index: usize,
        result: bool,
        now: Timestamp,
    ) -> Result<RecordOutcome, CampaignError> {
        let ctx = CallContext::new(*caller, now);
        self.engine
            .record_verification_result(self.campaign, &ctx, milestone_index, result)
    }
}
