use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;

use crate::domain::enrollment::{EnrollOutcome, Enrollment, EnrollmentLedger, LedgerError};
use crate::domain::event::{CatalogError, EventCatalog, EventId, EventValidation};
use crate::domain::member::{IdentityError, IdentityResolver, MemberId, Principal};
use crate::metrics::Metrics;
use crate::utils::IsTransient;

use super::errors::{InvalidEventReason, SignupError};

#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub event_id: EventId,
    pub comments: Option<String>,
}

/// Terminal outcomes that are not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum SignupOutcome {
    Success(Enrollment),
    /// The member was already enrolled; carries the original record.
    DuplicateSignup(Enrollment),
}

impl SignupOutcome {
    pub fn enrollment(&self) -> &Enrollment {
        match self {
            SignupOutcome::Success(e) | SignupOutcome::DuplicateSignup(e) => e,
        }
    }

    pub fn outcome_label(&self) -> &'static str {
        match self {
            SignupOutcome::Success(_) => "success",
            SignupOutcome::DuplicateSignup(_) => "duplicate",
        }
    }
}

// ============================================================================
// Signup Coordinator
// ============================================================================
//
// Collaborators are built once at startup and shared by reference; the
// coordinator itself holds no mutable state.
//
// ============================================================================

pub struct SignupCoordinator {
    catalog: Arc<EventCatalog>,
    resolver: Arc<IdentityResolver>,
    ledger: Arc<EnrollmentLedger>,
    metrics: Arc<Metrics>,
}

impl SignupCoordinator {
    pub fn new(
        catalog: Arc<EventCatalog>,
        resolver: Arc<IdentityResolver>,
        ledger: Arc<EnrollmentLedger>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            catalog,
            resolver,
            ledger,
            metrics,
        }
    }

    pub async fn enroll(
        &self,
        principal: Option<&Principal>,
        request: SignupRequest,
    ) -> Result<SignupOutcome, SignupError> {
        let started = Instant::now();
        let result = self.run_signup(principal, request).await;

        let label = match &result {
            Ok(outcome) => outcome.outcome_label(),
            Err(error) => error.outcome_label(),
        };
        self.metrics.record_signup(label, started.elapsed().as_secs_f64());

        result
    }

    /// The caller's enrollments, oldest first. Never creates a member.
    pub async fn my_enrollments(
        &self,
        principal: Option<&Principal>,
    ) -> Result<Vec<Enrollment>, SignupError> {
        let principal = principal.ok_or(SignupError::Unauthenticated)?;
        let member_id = MemberId::from_principal(principal);

        Ok(self.ledger.list_for_member(&member_id).await?)
    }

    async fn run_signup(
        &self,
        principal: Option<&Principal>,
        request: SignupRequest,
    ) -> Result<SignupOutcome, SignupError> {
        let principal = principal.ok_or(SignupError::Unauthenticated)?;
        let event_id = request.event_id;

        let reason = match self.catalog.validate(&event_id).await? {
            EventValidation::Open(_) => None,
            EventValidation::NotFound => Some(InvalidEventReason::NotFound),
            EventValidation::Inactive(_) => Some(InvalidEventReason::Inactive),
        };
        if let Some(reason) = reason {
            tracing::warn!(
                principal = %principal.id(),
                event_id = %event_id,
                reason = ?reason,
                "Signup rejected: invalid event"
            );
            return Err(SignupError::InvalidEvent { event_id, reason });
        }

        let member = self.resolver.resolve_or_create(principal).await?;

        // Own task: dropping the request must not abandon an in-flight write.
        let ledger = self.ledger.clone();
        let member_id = member.member_id;
        let comments = request.comments;
        let write = tokio::spawn(async move {
            let outcome = ledger.enroll(&member_id, &event_id, comments).await;
            (member_id, event_id, outcome)
        });

        let (member_id, event_id, outcome) = write
            .await
            .map_err(|e| SignupError::Internal(format!("enrollment task failed: {}", e)))?;

        match outcome? {
            EnrollOutcome::Created(enrollment) => Ok(SignupOutcome::Success(enrollment)),
            EnrollOutcome::AlreadyEnrolled(enrollment) => {
                tracing::info!(
                    member_id = %member_id,
                    event_id = %event_id,
                    "Duplicate signup"
                );
                Ok(SignupOutcome::DuplicateSignup(enrollment))
            }
        }
    }
}

fn store_error<E: IsTransient + Display>(error: E) -> SignupError {
    if error.is_transient() {
        SignupError::RetryableFailure(error.to_string())
    } else {
        tracing::error!(error = %error, "Non-retryable store failure during signup");
        SignupError::Internal(error.to_string())
    }
}

impl From<IdentityError> for SignupError {
    fn from(error: IdentityError) -> Self {
        match error {
            IdentityError::Unauthenticated => SignupError::Unauthenticated,
            other => store_error(other),
        }
    }
}

impl From<CatalogError> for SignupError {
    fn from(error: CatalogError) -> Self {
        store_error(error)
    }
}

impl From<LedgerError> for SignupError {
    fn from(error: LedgerError) -> Self {
        store_error(error)
    }
}
