use fundrelay_authority::{AuthorityError, SubmissionError};
use fundrelay_campaign::CampaignError;
use fundrelay_registry::RegistryError;
use fundrelay_types::{Address, Amount, ErrorKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error(transparent)]
    Campaign(#[from] CampaignError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Authority(#[from] AuthorityError),

    #[error("account {account} holds {balance}, needs {required}")]
    InsufficientBalance {
        account: Address,
        balance: Amount,
        required: Amount,
    },

    #[error("balance of {0} would overflow")]
    BalanceOverflow(Address),

    #[error("deposit amount must be positive")]
    ZeroDeposit,
}

impl ChainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Campaign(e) => e.kind(),
            Self::Registry(e) => e.kind(),
            Self::Authority(e) => e.kind(),
            Self::InsufficientBalance { .. } | Self::BalanceOverflow(_) | Self::ZeroDeposit => {
                ErrorKind::Validation
            }
        }
    }
}

impl From<SubmissionError<CampaignError>> for ChainError {
    fn from(err: SubmissionError<CampaignError>) -> Self {
        match err {
            SubmissionError::Authority(e) => Self::Authority(e),
            SubmissionError::Target(e) => Self::Campaign(e),
        }
    }
}
