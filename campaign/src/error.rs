use fundrelay_types::{Address, Amount, ErrorKind};
use fundrelay_utils::format_duration;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CampaignError {
    #[error("contribution amount must be positive")]
    ZeroAmount,

    #[error("contribution of {requested} exceeds remaining capacity {remaining}")]
    OverFunded { requested: Amount, remaining: Amount },

    #[error("{0} is not the campaign manager")]
    NotManager(Address),

    #[error("{0} is not the campaign's verification authority")]
    NotAuthority(Address),

    #[error("milestone {index} does not exist (campaign has {count})")]
    MilestoneOutOfRange { index: usize, count: usize },

    #[error("milestone {0} is already verified")]
    AlreadyVerified(usize),

    #[error(
        "milestone {index} verification was requested recently; retry in {}",
        format_duration(*remaining_secs)
    )]
    CooldownActive { index: usize, remaining_secs: u64 },

    #[error("milestone {index} is not eligible for withdrawal: {reason}")]
    NotEligible { index: usize, reason: Ineligibility },

    #[error("arithmetic overflow")]
    Overflow,
}

impl CampaignError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotManager(_) | Self::NotAuthority(_) => ErrorKind::Authorization,
            Self::MilestoneOutOfRange { .. } => ErrorKind::NotFound,
            Self::ZeroAmount
            | Self::OverFunded { .. }
            | Self::AlreadyVerified(_)
            | Self::CooldownActive { .. }
            | Self::NotEligible { .. }
            | Self::Overflow => ErrorKind::Validation,
        }
    }
}

/// Why a milestone cannot be withdrawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ineligibility {
    NotVerified,
    AlreadyWithdrawn,
    Underfunded { achieved: Amount, goal: Amount },
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotVerified => f.write_str("not verified"),
            Self::AlreadyWithdrawn => f.write_str("already withdrawn"),
            Self::Underfunded { achieved, goal } => {
                write!(f, "achieved {achieved} is below goal {goal}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_message_is_human_readable() {
        let err = CampaignError::CooldownActive {
            index: 1,
            remaining_secs: 3 * 3600 + 60,
        };
        assert!(err.to_string().ends_with("retry in 3h 1m"));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn underfunded_names_both_amounts() {
        let err = CampaignError::NotEligible {
            index: 0,
            reason: Ineligibility::Underfunded {
                achieved: Amount::whole(30),
                goal: Amount::whole(50),
            },
        };
        assert_eq!(
            err.to_string(),
            "milestone 0 is not eligible for withdrawal: achieved 30 is below goal 50"
        );
    }
}
