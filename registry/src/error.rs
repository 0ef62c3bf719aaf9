use fundrelay_types::{Address, Amount, ErrorKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{field} must be at least {min} characters")]
    NameTooShort { field: &'static str, min: usize },

    #[error("{field} is {len} bytes, the limit is {max}")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("a campaign needs at least one milestone")]
    NoMilestones,

    #[error("{count} milestones exceeds the limit of {max}")]
    TooManyMilestones { count: usize, max: usize },

    #[error("milestone {index} goal {goal} must be greater than {min}")]
    GoalTooSmall { index: usize, goal: Amount, min: Amount },

    #[error("milestone {index} goal {goal} has more than {max_decimals} decimal places")]
    GoalTooPrecise {
        index: usize,
        goal: Amount,
        max_decimals: u32,
    },

    #[error("milestone goals overflow")]
    GoalOverflow,

    #[error("campaign {0} not found")]
    CampaignNotFound(Address),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CampaignNotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Validation,
        }
    }
}
