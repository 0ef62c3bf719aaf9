use fundrelay_types::{Address, ErrorKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorityError {
    #[error("{0} may not manage providers")]
    NotProviderAdmin(Address),

    #[error("only the authority owner may change the admin; {0} is not the owner")]
    NotOwner(Address),

    #[error("{0} is not a registered provider")]
    NotProvider(Address),

    #[error("the zero address cannot be a provider")]
    InvalidProvider,
}

impl AuthorityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotProviderAdmin(_) | Self::NotOwner(_) | Self::NotProvider(_) => {
                ErrorKind::Authorization
            }
            Self::InvalidProvider => ErrorKind::Validation,
        }
    }
}

/// Failure of a forwarded submission: either the authority refused the
/// caller, or the target refused the result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Authority(#[from] AuthorityError),

    #[error(transparent)]
    Target(E),
}
