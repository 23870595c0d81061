use std::sync::Arc;

use chrono::Utc;

use crate::metrics::Metrics;
use crate::store::{create_entity, load_entity, to_record, EntityStore, StoreError, StoreFailure};
use crate::utils::{retry_on_transient, RetryConfig};

use super::errors::IdentityError;
use super::model::Member;
use super::value_objects::{MemberId, Principal, Profile};

// ============================================================================
// Identity Resolver
// ============================================================================
//
// First contact: read by the derived key, and if absent insert-if-absent.
// Losing the insert race to a concurrent first contact is not an error: the
// winner's record is returned. Existing records are never overwritten here.
//
// ============================================================================

pub struct IdentityResolver {
    store: Arc<dyn EntityStore>,
    retry: RetryConfig,
    metrics: Arc<Metrics>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn EntityStore>, retry: RetryConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            retry,
            metrics,
        }
    }

    /// Resolve the member for `principal`, creating it on first contact.
    pub async fn resolve_or_create(&self, principal: &Principal) -> Result<Member, IdentityError> {
        let member_id = MemberId::from_principal(principal);
        let store = self.store.as_ref();
        let metrics = &self.metrics;

        let (member, created) = retry_on_transient("resolve_member", &self.retry, |attempt| {
            metrics.record_store_attempt("resolve_member", attempt);
            Self::try_resolve(store, &member_id, principal)
        })
        .await
        .into_result()?;

        if created {
            self.metrics.record_member_created();
            tracing::info!(
                member_id = %member.member_id,
                email = %member.primary_email,
                "✅ Created member on first contact"
            );
        }

        Ok(member)
    }

    /// Read-only lookup. Never creates a record.
    pub async fn find(&self, member_id: &MemberId) -> Result<Option<Member>, IdentityError> {
        let store = self.store.as_ref();
        let key = member_id.key();

        let member = retry_on_transient("load_member", &self.retry, |_attempt| {
            load_entity::<Member>(store, &key)
        })
        .await
        .into_result()?;

        Ok(member)
    }

    /// The caller's own record, created on first contact like the signup path.
    pub async fn current(&self, principal: &Principal) -> Result<Member, IdentityError> {
        self.resolve_or_create(principal).await
    }

    /// Replace the caller's profile. The member must already exist.
    pub async fn update_profile(
        &self,
        principal: &Principal,
        profile: Profile,
    ) -> Result<Member, IdentityError> {
        let member_id = MemberId::from_principal(principal);
        let existing = self
            .find(&member_id)
            .await?
            .ok_or_else(|| IdentityError::MemberNotFound(member_id.clone()))?;

        let updated = existing.with_profile(profile, Utc::now());
        let record = to_record(&updated).map_err(StoreFailure::from)?;
        let store = self.store.as_ref();

        retry_on_transient("update_member", &self.retry, |_attempt| store.put(record.clone()))
            .await
            .into_result()?;

        tracing::info!(member_id = %member_id, "Updated member profile");
        Ok(updated)
    }

    async fn try_resolve(
        store: &dyn EntityStore,
        member_id: &MemberId,
        principal: &Principal,
    ) -> Result<(Member, bool), StoreError> {
        if let Some(member) = load_entity::<Member>(store, &member_id.key()).await? {
            tracing::debug!(member_id = %member_id, "Resolved existing member");
            return Ok((member, false));
        }

        let candidate = Member::first_contact(principal, Utc::now());
        match create_entity(store, &candidate).await? {
            None => Ok((candidate, true)),
            Some(winner) => {
                tracing::debug!(member_id = %member_id, "Lost first-contact race, using existing member");
                Ok((winner, false))
            }
        }
    }
}
