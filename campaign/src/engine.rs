//! Campaign transitions.

use crate::context::CallContext;
use crate::error::{CampaignError, Ineligibility};
use fundrelay_authority::RecordOutcome;
use fundrelay_ledger::{allocate_funding, Campaign, Contribution, LedgerEvent, Milestone, MilestoneState};
use fundrelay_types::{Amount, LedgerParams};
use serde::{Deserialize, Serialize};

/// A released milestone: the amount owed to the manager and the event to log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Withdrawal {
    pub amount: Amount,
    pub event: LedgerEvent,
}

/// Applies campaign transitions under a fixed set of ledger parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignEngine {
    params: LedgerParams,
}

impl CampaignEngine {
    pub fn new(params: LedgerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    /// Accept a contribution from any account.
    ///
    /// Contributions that would push the funded total past the goal total are
    /// rejected outright, never clamped.
    pub fn contribute(
        &self,
        campaign: &mut Campaign,
        ctx: &CallContext,
        amount: Amount,
    ) -> Result<LedgerEvent, CampaignError> {
        if amount.is_zero() {
            return Err(CampaignError::ZeroAmount);
        }
        let remaining = campaign.remaining_capacity();
        if amount > remaining {
            return Err(CampaignError::OverFunded {
                requested: amount,
                remaining,
            });
        }
        let funded = campaign
            .funded
            .checked_add(amount)
            .ok_or(CampaignError::Overflow)?;

        campaign
            .contributions
            .push(Contribution::new(ctx.caller, amount, ctx.now));
        campaign.backers.insert(ctx.caller);
        campaign.funded = funded;
        let allocation = allocate_funding(&campaign.goals(), funded);
        for (milestone, achieved) in campaign.milestones.iter_mut().zip(allocation) {
            milestone.achieved = achieved;
        }

        tracing::debug!(
            campaign = %campaign.address,
            backer = %ctx.caller,
            %amount,
            funded = %campaign.funded,
            "contribution accepted"
        );
        Ok(LedgerEvent::ContributionMade {
            campaign: campaign.address,
            backer: ctx.caller,
            amount,
            timestamp: ctx.now,
            campaign_name: campaign.name.clone(),
        })
    }

    /// Ask for a milestone to be verified. Manager only; a repeat request must
    /// come strictly more than one cooldown window after the previous one.
    pub fn request_verification(
        &self,
        campaign: &mut Campaign,
        ctx: &CallContext,
        index: usize,
    ) -> Result<LedgerEvent, CampaignError> {
        ensure_manager(campaign, ctx)?;
        let cooldown = self.params.verification_cooldown_secs;
        let milestone = milestone_mut(campaign, index)?;
        if milestone.verified {
            return Err(CampaignError::AlreadyVerified(index));
        }
        if let Some(last) = milestone.last_verification_request {
            if !last.is_older_than(cooldown, ctx.now) {
                return Err(CampaignError::CooldownActive {
                    index,
                    remaining_secs: last.remaining(cooldown.saturating_add(1), ctx.now),
                });
            }
        }
        milestone.last_verification_request = Some(ctx.now);

        tracing::info!(campaign = %campaign.address, milestone = index, "verification requested");
        Ok(LedgerEvent::MilestoneVerificationRequested {
            campaign: campaign.address,
            milestone_index: index,
        })
    }

    /// Record a verification result. Only the campaign's authority may call
    /// this; results for an already verified milestone change nothing.
    pub fn record_verification_result(
        &self,
        campaign: &mut Campaign,
        ctx: &CallContext,
        index: usize,
        result: bool,
    ) -> Result<RecordOutcome, CampaignError> {
        if ctx.caller != campaign.authority {
            return Err(CampaignError::NotAuthority(ctx.caller));
        }
        let address = campaign.address;
        let milestone = milestone_mut(campaign, index)?;
        if milestone.verified {
            return Ok(RecordOutcome::AlreadyVerified);
        }
        milestone.verified = result;

        tracing::debug!(campaign = %address, milestone = index, verified = result, "verification result applied");
        Ok(RecordOutcome::Recorded {
            verified: result,
            event: LedgerEvent::MilestoneVerificationRecorded {
                campaign: address,
                milestone_index: index,
                verified: result,
            },
        })
    }

    /// Release a milestone's goal amount to the manager.
    pub fn withdraw(
        &self,
        campaign: &mut Campaign,
        ctx: &CallContext,
        index: usize,
    ) -> Result<Withdrawal, CampaignError> {
        ensure_manager(campaign, ctx)?;
        let milestone = campaign
            .milestones
            .get(index)
            .ok_or(CampaignError::MilestoneOutOfRange {
                index,
                count: campaign.milestones.len(),
            })?;
        let reason = if milestone.withdrawn {
            Some(Ineligibility::AlreadyWithdrawn)
        } else if !milestone.verified {
            Some(Ineligibility::NotVerified)
        } else if !milestone.is_fully_funded() {
            Some(Ineligibility::Underfunded {
                achieved: milestone.achieved,
                goal: milestone.goal,
            })
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(CampaignError::NotEligible { index, reason });
        }
        let amount = milestone.goal;
        let withdrawn_total = campaign
            .withdrawn_total
            .checked_add(amount)
            .ok_or(CampaignError::Overflow)?;

        campaign.milestones[index].withdrawn = true;
        campaign.withdrawn_total = withdrawn_total;

        tracing::info!(campaign = %campaign.address, milestone = index, %amount, "funds released");
        Ok(Withdrawal {
            amount,
            event: LedgerEvent::FundsWithdrawn {
                campaign: campaign.address,
                milestone_index: index,
                manager: campaign.manager,
                amount,
            },
        })
    }

    /// Lifecycle state of one milestone.
    pub fn state_of(&self, campaign: &Campaign, index: usize) -> Result<MilestoneState, CampaignError> {
        campaign
            .milestone(index)
            .map(Milestone::state)
            .ok_or(CampaignError::MilestoneOutOfRange {
                index,
                count: campaign.milestone_count(),
            })
    }
}

fn ensure_manager(campaign: &Campaign, ctx: &CallContext) -> Result<(), CampaignError> {
    if ctx.caller == campaign.manager {
        Ok(())
    } else {
        Err(CampaignError::NotManager(ctx.caller))
    }
}

fn milestone_mut(campaign: &mut Campaign, index: usize) -> Result<&mut Milestone, CampaignError> {
    let count = campaign.milestones.len();
    campaign
        .milestones
        .get_mut(index)
        .ok_or(CampaignError::MilestoneOutOfRange { index, count })
}
