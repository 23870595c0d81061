use std::sync::Arc;

use crate::domain::event::EventId;
use crate::domain::member::MemberId;
use crate::metrics::Metrics;
use crate::store::{
    from_record, query_entities, to_record, CreateOutcome, EntityStore, Query, SortOrder, StoreFailure,
};
use crate::utils::{retry_on_transient, RetryConfig};

use super::errors::LedgerError;
use super::model::Enrollment;

// ============================================================================
// Enrollment Ledger
// ============================================================================
//
// enroll() issues one conditional create per attempt against the derived
// key. Whatever the store reports is final:
//   Created        -> this call enrolled the member
//   AlreadyExists  -> someone already did (unless the existing record is
//                     ours, written by an attempt whose ack was lost)
// Transient failures are retried; the write is idempotent so a retry can
// never produce a second record.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum EnrollOutcome {
    Created(Enrollment),
    AlreadyEnrolled(Enrollment),
}

pub struct EnrollmentLedger {
    store: Arc<dyn EntityStore>,
    retry: RetryConfig,
    metrics: Arc<Metrics>,
}

impl EnrollmentLedger {
    pub fn new(store: Arc<dyn EntityStore>, retry: RetryConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            retry,
            metrics,
        }
    }

    pub async fn enroll(
        &self,
        member_id: &MemberId,
        event_id: &EventId,
        comments: Option<String>,
    ) -> Result<EnrollOutcome, LedgerError> {
        let enrollment = Enrollment::new(member_id.clone(), event_id.clone(), comments);
        let record = to_record(&enrollment).map_err(StoreFailure::from)?;

        let store = self.store.as_ref();
        let metrics = &self.metrics;
        let outcome = retry_on_transient("enroll", &self.retry, |attempt| {
            metrics.record_store_attempt("enroll", attempt);
            store.conditional_create(record.clone())
        })
        .await
        .into_result()?;

        match outcome {
            CreateOutcome::Created => {
                tracing::info!(
                    member_id = %member_id,
                    event_id = %event_id,
                    signup_id = %enrollment.signup_id,
                    "✅ Enrollment recorded"
                );
                Ok(EnrollOutcome::Created(enrollment))
            }
            CreateOutcome::AlreadyExists(existing) => {
                let existing: Enrollment = from_record(existing).map_err(StoreFailure::from)?;

                if existing.signup_id == enrollment.signup_id {
                    tracing::info!(
                        member_id = %member_id,
                        event_id = %event_id,
                        signup_id = %enrollment.signup_id,
                        "Enrollment committed by an earlier attempt"
                    );
                    return Ok(EnrollOutcome::Created(existing));
                }

                tracing::info!(
                    member_id = %member_id,
                    event_id = %event_id,
                    enrolled_at = %existing.enrolled_at,
                    "Member already enrolled"
                );
                Ok(EnrollOutcome::AlreadyEnrolled(existing))
            }
        }
    }

    /// The member's enrollments, oldest first.
    pub async fn list_for_member(&self, member_id: &MemberId) -> Result<Vec<Enrollment>, LedgerError> {
        let query = Query::kind(Enrollment::KIND)
            .ancestor(member_id.key())
            .order(SortOrder::Ascending);

        let store = self.store.as_ref();
        let enrollments = retry_on_transient("list_enrollments", &self.retry, |_attempt| {
            query_entities::<Enrollment>(store, &query)
        })
        .await
        .into_result()?;

        tracing::debug!(member_id = %member_id, count = enrollments.len(), "Listed enrollments");
        Ok(enrollments)
    }
}
