//! The set of accounts currently trusted to submit verification results.

use fundrelay_types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Provider registry stored as an indexed sequence plus an address index.
///
/// Membership only says a provider is trusted *now*; the set carries no
/// history and assumes nothing about which process holds which account.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProviderSet {
    providers: Vec<Address>,
    #[serde(skip)]
    index: HashMap<Address, usize>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, provider: &Address) -> bool {
        self.index.contains_key(provider)
    }

    /// Insert a provider. Returns `false` if it was already present.
    pub fn insert(&mut self, provider: Address) -> bool {
        if self.contains(&provider) {
            return false;
        }
        self.index.insert(provider, self.providers.len());
        self.providers.push(provider);
        true
    }

    /// Remove a provider. Returns `false` if it was not present.
    pub fn remove(&mut self, provider: &Address) -> bool {
        let Some(pos) = self.index.remove(provider) else {
            return false;
        };
        self.providers.swap_remove(pos);
        if let Some(moved) = self.providers.get(pos) {
            self.index.insert(*moved, pos);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.providers.iter()
    }

    /// Rebuild the address index after deserialization.
    pub fn reindex(&mut self) {
        self.index = self
            .providers
            .iter()
            .enumerate()
            .map(|(i, addr)| (*addr, i))
            .collect();
    }
}

impl PartialEq for ProviderSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|p| other.contains(p))
    }
}

impl Eq for ProviderSet {}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(label: &str) -> Address {
        Address::from_label(label)
    }

    #[test]
    fn insert_is_idempotent() {
        let mut set = ProviderSet::new();
        assert!(set.insert(p("a")));
        assert!(!set.insert(p("a")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_keeps_index_consistent() {
        let mut set = ProviderSet::new();
        for label in ["a", "b", "c"] {
            set.insert(p(label));
        }
        assert!(set.remove(&p("a")));
        assert!(!set.remove(&p("a")));
        assert!(set.contains(&p("b")));
        assert!(set.contains(&p("c")));
        assert!(set.remove(&p("c")));
        assert!(set.contains(&p("b")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn reindex_restores_lookups() {
        let mut set = ProviderSet::new();
        set.insert(p("a"));
        set.insert(p("b"));
        let json = serde_json::to_string(&set).unwrap();
        let mut back: ProviderSet = serde_json::from_str(&json).unwrap();
        assert!(!back.contains(&p("a")));
        back.reindex();
        assert!(back.contains(&p("a")));
        assert_eq!(back, set);
    }
}
