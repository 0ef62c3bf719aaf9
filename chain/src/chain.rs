//! Transactions.
//!
//! Each method validates everything it can before the first mutation, and
//! the campaign and authority calls it delegates to do the same, so an `Err`
//! always means the state is unchanged.

use crate::error::ChainError;
use crate::receipt::Receipt;
use crate::state::LedgerState;
use fundrelay_authority::{RecordOutcome, VerificationAuthority};
use fundrelay_campaign::CallContext;
use fundrelay_ledger::{EventLog, LedgerEvent};
use fundrelay_registry::{CampaignDraft, Registry};
use fundrelay_types::{Address, Amount, Clock, LedgerParams, Timestamp};
use std::sync::Arc;

pub struct Chain {
    state: LedgerState,
    clock: Arc<dyn Clock>,
}

impl Chain {
    pub fn new(owner: Address, params: LedgerParams, clock: Arc<dyn Clock>) -> Self {
        Self::from_state(LedgerState::genesis(owner, params), clock)
    }

    /// Resume from a previously saved state.
    pub fn from_state(mut state: LedgerState, clock: Arc<dyn Clock>) -> Self {
        state.reindex();
        Self { state, clock }
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn registry(&self) -> &Registry {
        &self.state.registry
    }

    pub fn authority(&self) -> &VerificationAuthority {
        &self.state.authority
    }

    pub fn events(&self) -> &EventLog {
        &self.state.events
    }

    pub fn params(&self) -> &LedgerParams {
        self.state.registry.params()
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.state.balance_of(account)
    }

    fn context(&self, caller: Address) -> CallContext {
        CallContext::new(caller, self.clock.now())
    }

    fn log(&mut self, event: LedgerEvent, now: Timestamp) -> Receipt {
        Receipt::single(self.state.events.append(event, now))
    }

    fn credit_check(&self, account: &Address, amount: Amount) -> Result<Amount, ChainError> {
        self.balance_of(account)
            .checked_add(amount)
            .ok_or(ChainError::BalanceOverflow(*account))
    }

    /// Credit an account from nothing. Used by the dev faucet and genesis
    /// allocations.
    pub fn deposit(&mut self, account: Address, amount: Amount) -> Result<Amount, ChainError> {
        if amount.is_zero() {
            return Err(ChainError::ZeroDeposit);
        }
        let balance = self.credit_check(&account, amount)?;
        self.state.balances.insert(account, balance);
        tracing::debug!(%account, %amount, %balance, "deposit");
        Ok(balance)
    }

    pub fn create_campaign(
        &mut self,
        caller: Address,
        draft: CampaignDraft,
    ) -> Result<(Address, Receipt), ChainError> {
        let ctx = self.context(caller);
        let (address, event) = self.state.registry.create_campaign(&ctx, draft)?;
        Ok((address, self.log(event, ctx.now)))
    }

    /// Move `amount` from the backer's balance into the campaign's escrow.
    pub fn contribute(
        &mut self,
        caller: Address,
        campaign: &Address,
        amount: Amount,
    ) -> Result<Receipt, ChainError> {
        let ctx = self.context(caller);
        let balance = self.balance_of(&caller);
        let remaining = balance
            .checked_sub(amount)
            .ok_or(ChainError::InsufficientBalance {
                account: caller,
                balance,
                required: amount,
            })?;

        let event = self
            .state
            .registry
            .contract(campaign)?
            .contribute(&ctx, amount)?;
        self.state.balances.insert(caller, remaining);
        Ok(self.log(event, ctx.now))
    }

    pub fn request_verification(
        &mut self,
        caller: Address,
        campaign: &Address,
        milestone_index: usize,
    ) -> Result<Receipt, ChainError> {
        let ctx = self.context(caller);
        let event = self
            .state
            .registry
            .contract(campaign)?
            .request_verification(&ctx, milestone_index)?;
        Ok(self.log(event, ctx.now))
    }

    /// Release a verified, fully funded milestone to the manager's balance.
    pub fn withdraw(
        &mut self,
        caller: Address,
        campaign: &Address,
        milestone_index: usize,
    ) -> Result<(Amount, Receipt), ChainError> {
        let ctx = self.context(caller);
        let goal = self
            .state
            .registry
            .campaign(campaign)?
            .milestone(milestone_index)
            .map(|m| m.goal)
            .unwrap_or(Amount::ZERO);
        let credited = self.credit_check(&caller, goal)?;

        let withdrawal = self
            .state
            .registry
            .contract(campaign)?
            .withdraw(&ctx, milestone_index)?;
        self.state.balances.insert(caller, credited);
        Ok((withdrawal.amount, self.log(withdrawal.event, ctx.now)))
    }

    /// A provider's verification result, routed through the authority.
    pub fn submit_verification(
        &mut self,
        caller: Address,
        campaign: &Address,
        milestone_index: usize,
        result: bool,
    ) -> Result<(RecordOutcome, Receipt), ChainError> {
        let now = self.clock.now();
        let authority = &self.state.authority;
        let mut contract = self.state.registry.contract(campaign)?;
        let outcome =
            authority.submit_verification(&caller, &mut contract, milestone_index, result, now)?;
        let receipt = match &outcome {
            RecordOutcome::Recorded { event, .. } => self.log(event.clone(), now),
            RecordOutcome::AlreadyVerified => Receipt::empty(self.state.events.next_sequence()),
        };
        Ok((outcome, receipt))
    }

    pub fn add_provider(
        &mut self,
        caller: Address,
        provider: Address,
    ) -> Result<(bool, Receipt), ChainError> {
        let now = self.clock.now();
        let added = self.state.authority.add_provider(&caller, provider)?;
        let receipt = if added {
            tracing::info!(%provider, "provider added");
            self.log(LedgerEvent::ProviderAdded { provider }, now)
        } else {
            Receipt::empty(self.state.events.next_sequence())
        };
        Ok((added, receipt))
    }

    pub fn remove_provider(
        &mut self,
        caller: Address,
        provider: Address,
    ) -> Result<(bool, Receipt), ChainError> {
        let now = self.clock.now();
        let removed = self.state.authority.remove_provider(&caller, &provider)?;
        let receipt = if removed {
            tracing::info!(%provider, "provider removed");
            self.log(LedgerEvent::ProviderRemoved { provider }, now)
        } else {
            Receipt::empty(self.state.events.next_sequence())
        };
        Ok((removed, receipt))
    }

    pub fn set_authority_admin(
        &mut self,
        caller: Address,
        admin: Option<Address>,
    ) -> Result<(), ChainError> {
        self.state.authority.set_admin(&caller, admin)?;
        Ok(())
    }
}
