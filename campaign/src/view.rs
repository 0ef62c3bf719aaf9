//! Read projections served to clients.

use fundrelay_ledger::{Campaign, Milestone, MilestoneState};
use fundrelay_types::{Address, Amount, LedgerParams, Timestamp};
use serde::{Deserialize, Serialize};

/// Listing card for a campaign.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub address: Address,
    pub name: String,
    pub media_ref: String,
    pub funded: Amount,
    pub goal_total: Amount,
    pub backer_count: usize,
    pub milestone_count: usize,
}

impl CampaignSummary {
    pub fn of(campaign: &Campaign) -> Self {
        Self {
            address: campaign.address,
            name: campaign.name.clone(),
            media_ref: campaign.media_ref.clone(),
            funded: campaign.funded,
            goal_total: campaign.goal_total,
            backer_count: campaign.backer_count(),
            milestone_count: campaign.milestone_count(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneView {
    pub index: usize,
    pub name: String,
    pub description: String,
    pub goal: Amount,
    pub achieved: Amount,
    pub verified: bool,
    pub withdrawn: bool,
    pub state: MilestoneState,
    pub last_verification_request: Option<Timestamp>,
    /// Earliest time the manager may request verification again, if a
    /// request is still possible at all.
    pub next_request_at: Option<Timestamp>,
}

impl MilestoneView {
    pub fn of(index: usize, milestone: &Milestone, params: &LedgerParams) -> Self {
        let state = milestone.state();
        let next_request_at = if state.accepts_verification_request() {
            Some(
                milestone
                    .last_verification_request
                    .map(|t| {
                        t.saturating_add(params.verification_cooldown_secs)
                            .saturating_add(1)
                    })
                    .unwrap_or(Timestamp::EPOCH),
            )
        } else {
            None
        };
        Self {
            index,
            name: milestone.name.clone(),
            description: milestone.description.clone(),
            goal: milestone.goal,
            achieved: milestone.achieved,
            verified: milestone.verified,
            withdrawn: milestone.withdrawn,
            state,
            last_verification_request: milestone.last_verification_request,
            next_request_at,
        }
    }

    pub fn all(campaign: &Campaign, params: &LedgerParams) -> Vec<Self> {
        campaign
            .milestones
            .iter()
            .enumerate()
            .map(|(i, m)| Self::of(i, m, params))
            .collect()
    }
}

/// Full campaign page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignDetail {
    pub address: Address,
    pub name: String,
    pub description: String,
    pub media_ref: String,
    pub manager: Address,
    pub authority: Address,
    pub funded: Amount,
    pub goal_total: Amount,
    pub withdrawn_total: Amount,
    pub escrow_balance: Amount,
    pub backer_count: usize,
    pub created_at: Timestamp,
    pub milestones: Vec<MilestoneView>,
}

impl CampaignDetail {
    pub fn of(campaign: &Campaign, params: &LedgerParams) -> Self {
        Self {
            address: campaign.address,
            name: campaign.name.clone(),
            description: campaign.description.clone(),
            media_ref: campaign.media_ref.clone(),
            manager: campaign.manager,
            authority: campaign.authority,
            funded: campaign.funded,
            goal_total: campaign.goal_total,
            withdrawn_total: campaign.withdrawn_total,
            escrow_balance: campaign.escrow_balance(),
            backer_count: campaign.backer_count(),
            created_at: campaign.created_at,
            milestones: MilestoneView::all(campaign, params),
        }
    }
}

/// One row of a backer's contribution history across campaigns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackerContribution {
    pub campaign: Address,
    pub campaign_name: String,
    pub amount: Amount,
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundrelay_ledger::{CampaignMetadata, MilestoneSpec};

    #[test]
    fn milestone_view_reports_next_request_time() {
        let params = LedgerParams::default();
        let mut m = Milestone::from_spec(MilestoneSpec::new("m", "", Amount::whole(1)));
        assert_eq!(MilestoneView::of(0, &m, &params).next_request_at, Some(Timestamp::EPOCH));

        m.last_verification_request = Some(Timestamp::new(100));
        let view = MilestoneView::of(0, &m, &params);
        assert_eq!(view.state, MilestoneState::VerificationRequested);
        assert_eq!(view.next_request_at, Some(Timestamp::new(100 + 86_400 + 1)));

        m.verified = true;
        assert_eq!(MilestoneView::of(0, &m, &params).next_request_at, None);
    }

    #[test]
    fn summary_json_uses_decimal_amounts() {
        let campaign = Campaign::new(
            Address::from_label("c"),
            Address::from_label("m"),
            Address::from_label("a"),
            CampaignMetadata {
                name: "Library".into(),
                description: String::new(),
                media_ref: "bafy".into(),
            },
            vec![MilestoneSpec::new("books", "", Amount::whole(12))],
            Timestamp::EPOCH,
        )
        .unwrap();
        let value = serde_json::to_value(CampaignSummary::of(&campaign)).unwrap();
        assert_eq!(value["goal_total"], "12");
        assert_eq!(value["funded"], "0");
        assert_eq!(value["milestone_count"], 1);
    }
}
