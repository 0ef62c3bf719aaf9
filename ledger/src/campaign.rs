//! Campaign records.

use crate::contribution::Contribution;
use crate::error::InvariantViolation;
use crate::milestone::{allocate_funding, Milestone, MilestoneSpec};
use fundrelay_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Descriptive fields supplied by the creator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Off-chain media reference (content identifier). Opaque to the ledger.
    #[serde(default)]
    pub media_ref: String,
}

/// A deployed funding campaign.
///
/// The address is the durable identifier; campaigns are never destroyed.
/// The milestone sequence is fixed at creation in both length and order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub address: Address,
    pub name: String,
    pub description: String,
    pub media_ref: String,
    /// The creating account: sole authority for withdrawal and verification requests.
    pub manager: Address,
    /// The verification authority allowed to record verification results.
    pub authority: Address,
    pub milestones: Vec<Milestone>,
    pub goal_total: Amount,
    pub funded: Amount,
    pub withdrawn_total: Amount,
    pub contributions: Vec<Contribution>,
    /// Distinct contributors, cached from `contributions`.
    pub backers: BTreeSet<Address>,
    pub created_at: Timestamp,
}

impl Campaign {
    /// Build a fresh campaign record. Input validation is the registry's job;
    /// this returns `None` only if the goal sum overflows.
    pub fn new(
        address: Address,
        manager: Address,
        authority: Address,
        metadata: CampaignMetadata,
        specs: Vec<MilestoneSpec>,
        created_at: Timestamp,
    ) -> Option<Self> {
        let goal_total = Amount::checked_sum(specs.iter().map(|s| s.goal))?;
        Some(Self {
            address,
            name: metadata.name,
            description: metadata.description,
            media_ref: metadata.media_ref,
            manager,
            authority,
            milestones: specs.into_iter().map(Milestone::from_spec).collect(),
            goal_total,
            funded: Amount::ZERO,
            withdrawn_total: Amount::ZERO,
            contributions: Vec::new(),
            backers: BTreeSet::new(),
            created_at,
        })
    }

    pub fn milestone(&self, index: usize) -> Option<&Milestone> {
        self.milestones.get(index)
    }

    pub fn milestone_count(&self) -> usize {
        self.milestones.len()
    }

    pub fn backer_count(&self) -> usize {
        self.backers.len()
    }

    /// Funds still held for this campaign.
    pub fn escrow_balance(&self) -> Amount {
        self.funded.saturating_sub(self.withdrawn_total)
    }

    /// Amount that can still be contributed before the goal total is reached.
    pub fn remaining_capacity(&self) -> Amount {
        self.goal_total.saturating_sub(self.funded)
    }

    pub fn goals(&self) -> Vec<Amount> {
        self.milestones.iter().map(|m| m.goal).collect()
    }

    /// Contributions made by one backer, oldest first.
    pub fn contributions_of<'a>(
        &'a self,
        backer: &'a Address,
    ) -> impl Iterator<Item = &'a Contribution> + 'a {
        self.contributions.iter().filter(move |c| &c.backer == backer)
    }

    /// Total contributed by one backer.
    pub fn total_contributed_by(&self, backer: &Address) -> Amount {
        self.contributions_of(backer).map(|c| c.amount).sum()
    }

    /// Check every record-level invariant.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.milestones.is_empty() {
            return Err(InvariantViolation::NoMilestones);
        }

        let computed_goals = Amount::checked_sum(self.milestones.iter().map(|m| m.goal))
            .ok_or(InvariantViolation::Overflow)?;
        if computed_goals != self.goal_total {
            return Err(InvariantViolation::GoalTotalMismatch {
                cached: self.goal_total.to_string(),
                computed: computed_goals.to_string(),
            });
        }

        if let Some(i) = self.contributions.iter().position(|c| c.amount.is_zero()) {
            return Err(InvariantViolation::ZeroContribution(i));
        }

        let contributed = Amount::checked_sum(self.contributions.iter().map(|c| c.amount))
            .ok_or(InvariantViolation::Overflow)?;
        if contributed != self.funded {
            return Err(InvariantViolation::FundedMismatch {
                funded: self.funded.to_string(),
                contributed: contributed.to_string(),
            });
        }
        if self.funded > self.goal_total {
            return Err(InvariantViolation::OverFunded {
                funded: self.funded.to_string(),
                goal_total: self.goal_total.to_string(),
            });
        }

        let allocation = allocate_funding(&self.goals(), self.funded);
        for (index, (milestone, allocated)) in self.milestones.iter().zip(allocation).enumerate() {
            if milestone.goal.is_zero() {
                return Err(InvariantViolation::NonPositiveGoal(index));
            }
            if milestone.achieved > milestone.goal {
                return Err(InvariantViolation::AchievedAboveGoal {
                    index,
                    achieved: milestone.achieved.to_string(),
                    goal: milestone.goal.to_string(),
                });
            }
            if milestone.achieved != allocated {
                return Err(InvariantViolation::AllocationMismatch {
                    index,
                    cached: milestone.achieved.to_string(),
                    allocated: allocated.to_string(),
                });
            }
            if milestone.withdrawn && !milestone.verified {
                return Err(InvariantViolation::WithdrawnUnverified(index));
            }
        }

        let expected_withdrawn = Amount::checked_sum(
            self.milestones
                .iter()
                .filter(|m| m.withdrawn)
                .map(|m| m.goal),
        )
        .ok_or(InvariantViolation::Overflow)?;
        if expected_withdrawn != self.withdrawn_total {
            return Err(InvariantViolation::WithdrawnMismatch {
                withdrawn: self.withdrawn_total.to_string(),
                expected: expected_withdrawn.to_string(),
            });
        }

        let contributors: BTreeSet<Address> =
            self.contributions.iter().map(|c| c.backer).collect();
        if contributors != self.backers {
            return Err(InvariantViolation::BackerSetMismatch);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Campaign {
        Campaign::new(
            Address::from_label("campaign"),
            Address::from_label("manager"),
            Address::from_label("authority"),
            CampaignMetadata {
                name: "Solar roof".into(),
                description: "Panels for the community hall".into(),
                media_ref: "bafy-demo".into(),
            },
            vec![
                MilestoneSpec::new("design", "", Amount::from_raw(40)),
                MilestoneSpec::new("install", "", Amount::from_raw(60)),
            ],
            Timestamp::new(10),
        )
        .unwrap()
    }

    #[test]
    fn fresh_campaign_satisfies_invariants() {
        let c = sample();
        assert_eq!(c.goal_total, Amount::from_raw(100));
        assert_eq!(c.remaining_capacity(), Amount::from_raw(100));
        c.check_invariants().unwrap();
    }

    #[test]
    fn goal_sum_overflow_is_refused() {
        let created = Campaign::new(
            Address::from_label("c"),
            Address::from_label("m"),
            Address::from_label("a"),
            CampaignMetadata::default(),
            vec![
                MilestoneSpec::new("a", "", Amount::from_raw(u128::MAX)),
                MilestoneSpec::new("b", "", Amount::from_raw(1)),
            ],
            Timestamp::EPOCH,
        );
        assert!(created.is_none());
    }

    #[test]
    fn detects_funded_mismatch() {
        let mut c = sample();
        c.funded = Amount::from_raw(5);
        assert!(matches!(
            c.check_invariants(),
            Err(InvariantViolation::FundedMismatch { .. })
        ));
    }

    #[test]
    fn detects_withdrawn_without_verification() {
        let mut c = sample();
        c.milestones[0].withdrawn = true;
        c.withdrawn_total = Amount::from_raw(40);
        assert_eq!(
            c.check_invariants(),
            Err(InvariantViolation::WithdrawnUnverified(0))
        );
    }

    #[test]
    fn per_backer_history_is_derived_from_contributions() {
        let mut c = sample();
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        for (backer, raw) in [(alice, 10), (bob, 5), (alice, 7)] {
            c.contributions
                .push(Contribution::new(backer, Amount::from_raw(raw), Timestamp::new(20)));
            c.backers.insert(backer);
            c.funded = c.funded + Amount::from_raw(raw);
        }
        let allocation = allocate_funding(&c.goals(), c.funded);
        for (m, a) in c.milestones.iter_mut().zip(allocation) {
            m.achieved = a;
        }
        c.check_invariants().unwrap();
        assert_eq!(c.total_contributed_by(&alice), Amount::from_raw(17));
        assert_eq!(c.contributions_of(&bob).count(), 1);
        assert_eq!(c.backer_count(), 2);
    }
}
