//! The complete persisted ledger state.

use fundrelay_authority::VerificationAuthority;
use fundrelay_ledger::EventLog;
use fundrelay_registry::Registry;
use fundrelay_types::{Address, Amount, LedgerParams};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const AUTHORITY_DOMAIN: &[u8] = b"fundrelay/authority";
const REGISTRY_DOMAIN: &[u8] = b"fundrelay/registry";

/// Everything the ledger knows. Serializable as a whole for snapshots.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerState {
    pub registry: Registry,
    pub authority: VerificationAuthority,
    pub balances: BTreeMap<Address, Amount>,
    pub events: EventLog,
}

impl LedgerState {
    /// A fresh ledger whose authority and registry are deployed by `owner`.
    pub fn genesis(owner: Address, params: LedgerParams) -> Self {
        let authority_address = Address::derive(AUTHORITY_DOMAIN, &[owner.as_bytes()]);
        let registry_address = Address::derive(REGISTRY_DOMAIN, &[owner.as_bytes()]);
        Self {
            registry: Registry::new(registry_address, authority_address, params),
            authority: VerificationAuthority::new(authority_address, owner),
            balances: BTreeMap::new(),
            events: EventLog::new(),
        }
    }

    /// Rebuild in-memory indexes after loading from a snapshot.
    pub fn reindex(&mut self) {
        self.registry.reindex();
        self.authority.reindex();
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(Amount::ZERO)
    }
}
