//! Ledger parameters shared by every campaign deployed on a ledger.

use serde::{Deserialize, Serialize};

use crate::amount::{Amount, DECIMALS};

/// Minimum time between two verification requests for the same milestone.
pub const DEFAULT_VERIFICATION_COOLDOWN_SECS: u64 = 24 * 60 * 60;

/// Tunable limits enforced by the registry and campaign state machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerParams {
    /// Cooldown window between verification requests, in seconds.
    #[serde(default = "default_cooldown")]
    pub verification_cooldown_secs: u64,

    /// Upper bound on milestones per campaign.
    #[serde(default = "default_max_milestones")]
    pub max_milestones: usize,

    /// Fractional digits a milestone goal may carry. The smallest unit at
    /// this precision is also the floor a goal must exceed.
    #[serde(default = "default_goal_decimals")]
    pub goal_decimals: u32,

    /// Lower bound on campaign and milestone names, in characters.
    #[serde(default = "default_min_name_len")]
    pub min_name_len: usize,

    /// Upper bound on campaign and milestone names, in bytes.
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,

    /// Upper bound on descriptions, in bytes.
    #[serde(default = "default_max_description_len")]
    pub max_description_len: usize,
}

fn default_cooldown() -> u64 {
    DEFAULT_VERIFICATION_COOLDOWN_SECS
}

fn default_max_milestones() -> usize {
    32
}

fn default_goal_decimals() -> u32 {
    6
}

fn default_min_name_len() -> usize {
    2
}

fn default_max_name_len() -> usize {
    256
}

fn default_max_description_len() -> usize {
    4_096
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            verification_cooldown_secs: default_cooldown(),
            max_milestones: default_max_milestones(),
            goal_decimals: default_goal_decimals(),
            min_name_len: default_min_name_len(),
            max_name_len: default_max_name_len(),
            max_description_len: default_max_description_len(),
        }
    }
}

impl LedgerParams {
    /// Parameters for local development: a one-minute cooldown so the full
    /// request/verify/withdraw cycle can be exercised by hand.
    pub fn dev() -> Self {
        Self {
            verification_cooldown_secs: 60,
            ..Self::default()
        }
    }

    /// Smallest goal step: one unit at `goal_decimals` precision. Goals must
    /// be a multiple of it and strictly greater than it.
    pub fn goal_step(&self) -> Amount {
        let decimals = self.goal_decimals.min(DECIMALS);
        Amount::from_raw(10u128.pow(DECIMALS - decimals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_step_follows_precision() {
        let params = LedgerParams::default();
        assert_eq!(params.goal_step().to_string(), "0.000001");

        let whole = LedgerParams { goal_decimals: 0, ..params.clone() };
        assert_eq!(whole.goal_step(), Amount::whole(1));

        let finest = LedgerParams { goal_decimals: 30, ..params };
        assert_eq!(finest.goal_step(), Amount::MIN_POSITIVE);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let params: LedgerParams = serde_json::from_str(r#"{"max_milestones": 4}"#).unwrap();
        assert_eq!(params.max_milestones, 4);
        assert_eq!(params.goal_decimals, 6);
        assert_eq!(params.min_name_len, 2);
    }
}
