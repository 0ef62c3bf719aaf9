//! Provider registry and submission gate.

use crate::error::{AuthorityError, SubmissionError};
use crate::target::{RecordOutcome, VerificationTarget};
use fundrelay_ledger::ProviderSet;
use fundrelay_types::{Address, Timestamp};
use serde::{Deserialize, Serialize};

/// The verification authority record.
///
/// Every mutating method validates fully before touching state, so a call
/// either applies completely or not at all.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationAuthority {
    address: Address,
    owner: Address,
    admin: Option<Address>,
    providers: ProviderSet,
}

impl VerificationAuthority {
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            admin: None,
            providers: ProviderSet::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn admin(&self) -> Option<Address> {
        self.admin
    }

    /// Whether `account` may add and remove providers.
    pub fn can_manage_providers(&self, account: &Address) -> bool {
        *account == self.owner || self.admin.as_ref() == Some(account)
    }

    /// Designate (or clear) the admin. Owner only.
    pub fn set_admin(
        &mut self,
        caller: &Address,
        admin: Option<Address>,
    ) -> Result<(), AuthorityError> {
        if *caller != self.owner {
            return Err(AuthorityError::NotOwner(*caller));
        }
        self.admin = admin;
        tracing::info!(owner = %caller, admin = ?admin.map(|a| a.to_string()), "authority admin updated");
        Ok(())
    }

    /// Register a provider. Returns whether the set changed; re-adding an
    /// existing provider succeeds without effect.
    pub fn add_provider(
        &mut self,
        caller: &Address,
        provider: Address,
    ) -> Result<bool, AuthorityError> {
        if !self.can_manage_providers(caller) {
            return Err(AuthorityError::NotProviderAdmin(*caller));
        }
        if provider.is_zero() {
            return Err(AuthorityError::InvalidProvider);
        }
        let added = self.providers.insert(provider);
        tracing::debug!(%provider, added, "add provider");
        Ok(added)
    }

    /// Deregister a provider. Returns whether the set changed.
    pub fn remove_provider(
        &mut self,
        caller: &Address,
        provider: &Address,
    ) -> Result<bool, AuthorityError> {
        if !self.can_manage_providers(caller) {
            return Err(AuthorityError::NotProviderAdmin(*caller));
        }
        let removed = self.providers.remove(provider);
        tracing::debug!(%provider, removed, "remove provider");
        Ok(removed)
    }

    pub fn is_provider(&self, account: &Address) -> bool {
        self.providers.contains(account)
    }

    pub fn providers(&self) -> impl Iterator<Item = &Address> {
        self.providers.iter()
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Check that `caller` may submit verification results.
    pub fn authorize_submission(&self, caller: &Address) -> Result<(), AuthorityError> {
        if self.is_provider(caller) {
            Ok(())
        } else {
            Err(AuthorityError::NotProvider(*caller))
        }
    }

    /// Forward a provider's verification result to `target`, acting as the
    /// authority.
    pub fn submit_verification<T>(
        &self,
        caller: &Address,
        target: &mut T,
        milestone_index: usize,
        result: bool,
        now: Timestamp,
    ) -> Result<RecordOutcome, SubmissionError<T::Error>>
    where
        T: VerificationTarget + ?Sized,
    {
        self.authorize_submission(caller)?;
        let outcome = target
            .record_verification_result(&self.address, milestone_index, result, now)
            .map_err(SubmissionError::Target)?;
        match &outcome {
            RecordOutcome::Recorded { verified, .. } => tracing::info!(
                provider = %caller,
                campaign = %target.target_address(),
                milestone = milestone_index,
                verified,
                "verification result recorded"
            ),
            RecordOutcome::AlreadyVerified => tracing::debug!(
                provider = %caller,
                campaign = %target.target_address(),
                milestone = milestone_index,
                "milestone already verified, submission ignored"
            ),
        }
        Ok(outcome)
    }

    /// Rebuild lookup indexes after deserialization.
    pub fn reindex(&mut self) {
        self.providers.reindex();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundrelay_ledger::LedgerEvent;
    use thiserror::Error;

    #[derive(Debug, Error, PartialEq, Eq)]
    #[error("refused")]
    struct Refused;

    /// A single-milestone target that insists on being called by its authority.
    struct FakeTarget {
        address: Address,
        authority: Address,
        verified: bool,
        calls: usize,
    }

    impl VerificationTarget for FakeTarget {
        type Error = Refused;

        fn target_address(&self) -> Address {
            self.address
        }

        fn record_verification_result(
            &mut self,
            caller: &Address,
            milestone_index: usize,
            result: bool,
            _now: Timestamp,
        ) -> Result<RecordOutcome, Refused> {
            self.calls += 1;
            if *caller != self.authority || milestone_index != 0 {
                return Err(Refused);
            }
            if self.verified {
                return Ok(RecordOutcome::AlreadyVerified);
            }
            self.verified = result;
            Ok(RecordOutcome::Recorded {
                verified: result,
                event: LedgerEvent::MilestoneVerificationRecorded {
                    campaign: self.address,
                    milestone_index,
                    verified: result,
                },
            })
        }
    }

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    fn setup() -> (VerificationAuthority, FakeTarget) {
        let authority = VerificationAuthority::new(addr("authority"), addr("owner"));
        let target = FakeTarget {
            address: addr("campaign"),
            authority: addr("authority"),
            verified: false,
            calls: 0,
        };
        (authority, target)
    }

    #[test]
    fn only_owner_or_admin_manage_providers() {
        let (mut authority, _) = setup();
        assert_eq!(
            authority.add_provider(&addr("mallory"), addr("p")),
            Err(AuthorityError::NotProviderAdmin(addr("mallory")))
        );
        assert_eq!(authority.add_provider(&addr("owner"), addr("p")), Ok(true));

        authority.set_admin(&addr("owner"), Some(addr("admin"))).unwrap();
        assert_eq!(authority.add_provider(&addr("admin"), addr("q")), Ok(true));
        assert_eq!(authority.remove_provider(&addr("admin"), &addr("p")), Ok(true));
        assert_eq!(authority.provider_count(), 1);
    }

    #[test]
    fn admin_cannot_replace_itself() {
        let (mut authority, _) = setup();
        authority.set_admin(&addr("owner"), Some(addr("admin"))).unwrap();
        assert_eq!(
            authority.set_admin(&addr("admin"), None),
            Err(AuthorityError::NotOwner(addr("admin")))
        );
        assert_eq!(authority.admin(), Some(addr("admin")));
    }

    #[test]
    fn re_adding_and_re_removing_are_no_ops() {
        let (mut authority, _) = setup();
        assert_eq!(authority.add_provider(&addr("owner"), addr("p")), Ok(true));
        assert_eq!(authority.add_provider(&addr("owner"), addr("p")), Ok(false));
        assert_eq!(authority.remove_provider(&addr("owner"), &addr("p")), Ok(true));
        assert_eq!(authority.remove_provider(&addr("owner"), &addr("p")), Ok(false));
    }

    #[test]
    fn zero_address_is_not_a_provider() {
        let (mut authority, _) = setup();
        assert_eq!(
            authority.add_provider(&addr("owner"), Address::ZERO),
            Err(AuthorityError::InvalidProvider)
        );
    }

    #[test]
    fn non_provider_submission_never_reaches_target() {
        let (authority, mut target) = setup();
        let err = authority
            .submit_verification(&addr("p"), &mut target, 0, true, Timestamp::EPOCH)
            .unwrap_err();
        assert_eq!(
            err,
            SubmissionError::Authority(AuthorityError::NotProvider(addr("p")))
        );
        assert_eq!(target.calls, 0);
    }

    #[test]
    fn provider_submission_is_forwarded_as_authority() {
        let (mut authority, mut target) = setup();
        authority.add_provider(&addr("owner"), addr("p")).unwrap();

        let first = authority
            .submit_verification(&addr("p"), &mut target, 0, true, Timestamp::EPOCH)
            .unwrap();
        assert!(first.changed_state());
        assert!(target.verified);

        let second = authority
            .submit_verification(&addr("p"), &mut target, 0, true, Timestamp::EPOCH)
            .unwrap();
        assert_eq!(second, RecordOutcome::AlreadyVerified);
    }

    #[test]
    fn target_errors_are_passed_through() {
        let (mut authority, mut target) = setup();
        authority.add_provider(&addr("owner"), addr("p")).unwrap();
        let err = authority
            .submit_verification(&addr("p"), &mut target, 7, true, Timestamp::EPOCH)
            .unwrap_err();
        assert_eq!(err, SubmissionError::Target(Refused));
    }

    #[test]
    fn removed_provider_loses_access() {
        let (mut authority, mut target) = setup();
        authority.add_provider(&addr("owner"), addr("p")).unwrap();
        authority.remove_provider(&addr("owner"), &addr("p")).unwrap();
        assert!(authority
            .submit_verification(&addr("p"), &mut target, 0, true, Timestamp::EPOCH)
            .is_err());
    }
}
