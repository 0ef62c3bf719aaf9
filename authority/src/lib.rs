//! Verification authority.
//!
//! The single on-ledger gate between off-chain providers and campaigns'
//! verified flags. The authority keeps the provider set (managed by its owner
//! or a designated admin) and forwards a provider's submission to the target
//! campaign acting as itself, so campaigns only ever need to trust one
//! address and never learn who the individual providers are.

pub mod authority;
pub mod error;
pub mod target;

pub use authority::VerificationAuthority;
pub use error::{AuthorityError, SubmissionError};
pub use target::{RecordOutcome, VerificationTarget};
