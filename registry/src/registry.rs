use crate::error::RegistryError;
use fundrelay_campaign::{
    BackerContribution, CallContext, CampaignContract, CampaignDetail, CampaignEngine,
    CampaignSummary,
};
use fundrelay_ledger::{Campaign, CampaignMetadata, LedgerEvent, MilestoneSpec};
use fundrelay_types::{Address, LedgerParams};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const CAMPAIGN_DOMAIN: &[u8] = b"fundrelay/campaign";

/// Everything a creator supplies to deploy a campaign.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignDraft {
    #[serde(flatten)]
    pub metadata: CampaignMetadata,
    pub milestones: Vec<MilestoneSpec>,
}

/// Factory and arena of campaigns.
///
/// Campaigns are appended and never removed, so an arena index stays valid
/// for the life of the registry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Registry {
    address: Address,
    authority: Address,
    engine: CampaignEngine,
    deploy_nonce: u64,
    campaigns: Vec<Campaign>,
    #[serde(skip)]
    index: HashMap<Address, usize>,
}

impl Registry {
    /// A registry at `address` whose campaigns all trust `authority`.
    pub fn new(address: Address, authority: Address, params: LedgerParams) -> Self {
        Self {
            address,
            authority,
            engine: CampaignEngine::new(params),
            deploy_nonce: 0,
            campaigns: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn authority(&self) -> Address {
        self.authority
    }

    pub fn params(&self) -> &LedgerParams {
        self.engine.params()
    }

    pub fn engine(&self) -> &CampaignEngine {
        &self.engine
    }

    pub fn len(&self) -> usize {
        self.campaigns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty()
    }

    /// Deploy a new campaign managed by the caller.
    pub fn create_campaign(
        &mut self,
        ctx: &CallContext,
        draft: CampaignDraft,
    ) -> Result<(Address, LedgerEvent), RegistryError> {
        self.validate(&draft)?;

        let address = self.next_address(&ctx.caller);
        let campaign = Campaign::new(
            address,
            ctx.caller,
            self.authority,
            draft.metadata,
            draft.milestones,
            ctx.now,
        )
        .ok_or(RegistryError::GoalOverflow)?;

        let event = LedgerEvent::CampaignCreated {
            campaign: address,
            manager: ctx.caller,
            name: campaign.name.clone(),
            description: campaign.description.clone(),
        };
        self.deploy_nonce += 1;
        self.index.insert(address, self.campaigns.len());
        self.campaigns.push(campaign);

        tracing::info!(campaign = %address, manager = %ctx.caller, "campaign created");
        Ok((address, event))
    }

    fn validate(&self, draft: &CampaignDraft) -> Result<(), RegistryError> {
        let params = self.engine.params();
        let meta = &draft.metadata;
        check_name("name", &meta.name, params)?;
        check_len("description", &meta.description, params.max_description_len)?;

        if draft.milestones.is_empty() {
            return Err(RegistryError::NoMilestones);
        }
        if draft.milestones.len() > params.max_milestones {
            return Err(RegistryError::TooManyMilestones {
                count: draft.milestones.len(),
                max: params.max_milestones,
            });
        }
        let step = params.goal_step();
        for (i, spec) in draft.milestones.iter().enumerate() {
            if spec.goal.raw() % step.raw() != 0 {
                return Err(RegistryError::GoalTooPrecise {
                    index: i,
                    goal: spec.goal,
                    max_decimals: params.goal_decimals,
                });
            }
            if spec.goal <= step {
                return Err(RegistryError::GoalTooSmall {
                    index: i,
                    goal: spec.goal,
                    min: step,
                });
            }
            check_name("milestone name", &spec.name, params)?;
            check_len(
                "milestone description",
                &spec.description,
                params.max_description_len,
            )?;
        }
        Ok(())
    }

    fn next_address(&self, manager: &Address) -> Address {
        Address::derive(
            CAMPAIGN_DOMAIN,
            &[
                self.address.as_bytes(),
                manager.as_bytes(),
                &self.deploy_nonce.to_be_bytes(),
            ],
        )
    }

    /// All campaign addresses in creation order.
    pub fn list_campaigns(&self) -> Vec<Address> {
        self.campaigns.iter().map(|c| c.address).collect()
    }

    pub fn campaigns(&self) -> impl Iterator<Item = &Campaign> {
        self.campaigns.iter()
    }

    pub fn campaign(&self, address: &Address) -> Result<&Campaign, RegistryError> {
        self.index
            .get(address)
            .map(|&i| &self.campaigns[i])
            .ok_or(RegistryError::CampaignNotFound(*address))
    }

    /// A mutable contract handle for one campaign.
    pub fn contract(&mut self, address: &Address) -> Result<CampaignContract<'_>, RegistryError> {
        let i = *self
            .index
            .get(address)
            .ok_or(RegistryError::CampaignNotFound(*address))?;
        Ok(CampaignContract::new(&self.engine, &mut self.campaigns[i]))
    }

    pub fn campaign_summary(&self, address: &Address) -> Result<CampaignSummary, RegistryError> {
        self.campaign(address).map(CampaignSummary::of)
    }

    pub fn campaign_summaries(&self) -> Vec<CampaignSummary> {
        self.campaigns.iter().map(CampaignSummary::of).collect()
    }

    pub fn campaign_detail(&self, address: &Address) -> Result<CampaignDetail, RegistryError> {
        let params = self.engine.params();
        self.campaign(address)
            .map(|c| CampaignDetail::of(c, params))
    }

    pub fn campaigns_managed_by(&self, manager: &Address) -> Vec<Address> {
        self.campaigns
            .iter()
            .filter(|c| &c.manager == manager)
            .map(|c| c.address)
            .collect()
    }

    /// Every contribution a backer made, across campaigns, newest first.
    pub fn contributions_by_backer(&self, backer: &Address) -> Vec<BackerContribution> {
        let mut history: Vec<BackerContribution> = self
            .campaigns
            .iter()
            .flat_map(|c| {
                c.contributions_of(backer).map(move |contribution| BackerContribution {
                    campaign: c.address,
                    campaign_name: c.name.clone(),
                    amount: contribution.amount,
                    timestamp: contribution.timestamp,
                })
            })
            .collect();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        history
    }

    /// Rebuild the address index after deserialization.
    pub fn reindex(&mut self) {
        self.index = self
            .campaigns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.address, i))
            .collect();
    }
}

fn check_name(field: &'static str, value: &str, params: &LedgerParams) -> Result<(), RegistryError> {
    if value.trim().chars().count() < params.min_name_len.max(1) {
        return Err(RegistryError::NameTooShort {
            field,
            min: params.min_name_len.max(1),
        });
    }
    check_len(field, value, params.max_name_len)
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), RegistryError> {
    if value.len() > max {
        Err(RegistryError::TooLong {
            field,
            len: value.len(),
            max,
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundrelay_types::{Amount, Timestamp};

    fn addr(s: &str) -> Address {
        Address::from_label(s)
    }

    fn registry() -> Registry {
        Registry::new(addr("registry"), addr("authority"), LedgerParams::default())
    }

    fn draft(name: &str, goals: &[u64]) -> CampaignDraft {
        CampaignDraft {
            metadata: CampaignMetadata {
                name: name.into(),
                description: "d".into(),
                media_ref: "bafy".into(),
            },
            milestones: goals
                .iter()
                .map(|g| MilestoneSpec::new("stage", "", Amount::whole(*g)))
                .collect(),
        }
    }

    fn at(caller: &str, secs: u64) -> CallContext {
        CallContext::new(addr(caller), Timestamp::new(secs))
    }

    #[test]
    fn create_derives_distinct_addresses_in_order() {
        let mut r = registry();
        let (a, event) = r.create_campaign(&at("alice", 1), draft("One", &[10])).unwrap();
        let (b, _) = r.create_campaign(&at("alice", 2), draft("Two", &[10])).unwrap();
        assert_ne!(a, b);
        assert_eq!(r.list_campaigns(), vec![a, b]);
        assert_eq!(r.campaign(&a).unwrap().authority, addr("authority"));
        assert!(matches!(event, LedgerEvent::CampaignCreated { campaign, .. } if campaign == a));
    }

    #[test]
    fn invalid_drafts_deploy_nothing() {
        let mut r = registry();
        let ctx = at("alice", 1);
        assert_eq!(
            r.create_campaign(&ctx, draft("  ", &[1])),
            Err(RegistryError::NameTooShort { field: "name", min: 2 })
        );
        assert_eq!(
            r.create_campaign(&ctx, draft(" x ", &[1])),
            Err(RegistryError::NameTooShort { field: "name", min: 2 })
        );
        assert_eq!(r.create_campaign(&ctx, draft("Xy", &[])), Err(RegistryError::NoMilestones));
        assert!(matches!(
            r.create_campaign(&ctx, draft("Xy", &[1, 0])),
            Err(RegistryError::GoalTooSmall { index: 1, .. })
        ));
        assert_eq!(
            r.create_campaign(&ctx, draft("Xy", &[1; 33])),
            Err(RegistryError::TooManyMilestones { count: 33, max: 32 })
        );
        let long = "n".repeat(257);
        assert!(matches!(
            r.create_campaign(&ctx, draft(&long, &[1])),
            Err(RegistryError::TooLong { field: "name", .. })
        ));
        assert!(r.is_empty());
    }

    fn goal_draft(goal: &str) -> CampaignDraft {
        CampaignDraft {
            milestones: vec![MilestoneSpec::new("stage", "", goal.parse().unwrap())],
            ..draft("Goals", &[])
        }
    }

    #[test]
    fn goals_must_exceed_the_smallest_step() {
        let mut r = registry();
        let ctx = at("alice", 1);
        for goal in ["0", "0.000001"] {
            assert!(matches!(
                r.create_campaign(&ctx, goal_draft(goal)),
                Err(RegistryError::GoalTooSmall { index: 0, .. })
            ));
        }
        assert!(matches!(
            r.create_campaign(&ctx, goal_draft("0.000000000000000001")),
            Err(RegistryError::GoalTooPrecise { index: 0, max_decimals: 6, .. })
        ));
        assert!(matches!(
            r.create_campaign(&ctx, goal_draft("1.0000005")),
            Err(RegistryError::GoalTooPrecise { .. })
        ));
        assert!(r.is_empty());

        r.create_campaign(&ctx, goal_draft("0.000002")).unwrap();
        r.create_campaign(&ctx, goal_draft("12.5")).unwrap();
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn milestone_names_need_two_characters() {
        let mut r = registry();
        let mut short = draft("Garden", &[10]);
        short.milestones[0].name = "m".into();
        assert_eq!(
            r.create_campaign(&at("alice", 1), short),
            Err(RegistryError::NameTooShort { field: "milestone name", min: 2 })
        );
    }

    #[test]
    fn unknown_campaign_is_not_found() {
        let mut r = registry();
        let err = r.campaign_summary(&addr("nope")).unwrap_err();
        assert_eq!(err.kind(), fundrelay_types::ErrorKind::NotFound);
        assert!(r.contract(&addr("nope")).is_err());
    }

    #[test]
    fn summary_reflects_contributions() {
        let mut r = registry();
        let (a, _) = r.create_campaign(&at("alice", 1), draft("Garden", &[60, 40])).unwrap();
        r.contract(&a)
            .unwrap()
            .contribute(&at("bob", 2), Amount::whole(25))
            .unwrap();
        let summary = r.campaign_summary(&a).unwrap();
        assert_eq!(summary.name, "Garden");
        assert_eq!(summary.media_ref, "bafy");
        assert_eq!(summary.funded, Amount::whole(25));
        assert_eq!(summary.goal_total, Amount::whole(100));
        assert_eq!(summary.backer_count, 1);
        assert_eq!(summary.milestone_count, 2);
    }

    #[test]
    fn backer_history_spans_campaigns_newest_first() {
        let mut r = registry();
        let (a, _) = r.create_campaign(&at("alice", 1), draft("Alpha", &[100])).unwrap();
        let (b, _) = r.create_campaign(&at("carol", 1), draft("Beta", &[100])).unwrap();
        r.contract(&a).unwrap().contribute(&at("bob", 5), Amount::whole(1)).unwrap();
        r.contract(&b).unwrap().contribute(&at("bob", 9), Amount::whole(2)).unwrap();
        r.contract(&a).unwrap().contribute(&at("dave", 7), Amount::whole(3)).unwrap();

        let history = r.contributions_by_backer(&addr("bob"));
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].campaign, b);
        assert_eq!(history[0].campaign_name, "B");
        assert_eq!(history[1].amount, Amount::whole(1));
        assert_eq!(r.campaigns_managed_by(&addr("carol")), vec![b]);
    }

    #[test]
    fn reindex_after_json_roundtrip() {
        let mut r = registry();
        let (a, _) = r.create_campaign(&at("alice", 1), draft("Alpha", &[5])).unwrap();
        let json = serde_json::to_string(&r).unwrap();
        let mut back: Registry = serde_json::from_str(&json).unwrap();
        back.reindex();
        assert_eq!(back.campaign(&a).unwrap().name, "A");
        let (next, _) = back.create_campaign(&at("alice", 2), draft("Beta", &[5])).unwrap();
        assert_ne!(next, a);
    }
}
