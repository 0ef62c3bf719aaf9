//! Campaign registry.
//!
//! Deploys campaigns at derived addresses and keeps them in an append-only
//! arena indexed by address.

pub mod error;
pub mod registry;

pub use error::RegistryError;
pub use registry::{CampaignDraft, Registry};
