// Private module declaration
mod server;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::configure as configure_routes;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Signup outcomes (success, duplicate, invalid event, ...)
// - Store retry attempts per operation
// - First-contact member creation
// - Signup latency
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub signup_outcomes: IntCounterVec,
    pub signup_duration: Histogram,
    pub store_retry_attempts: IntCounterVec,
    pub members_created: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let signup_outcomes = IntCounterVec::new(
            Opts::new("signup_outcomes_total", "Signup requests by terminal outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(signup_outcomes.clone()))?;

        let signup_duration = Histogram::with_opts(
            HistogramOpts::new("signup_duration_seconds", "End-to-end signup duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(signup_duration.clone()))?;

        let store_retry_attempts = IntCounterVec::new(
            Opts::new("store_retry_attempts_total", "Store operations re-attempted after a transient failure"),
            &["operation"],
        )?;
        registry.register(Box::new(store_retry_attempts.clone()))?;

        let members_created = IntCounter::new(
            "members_created_total",
            "Member records created on first contact",
        )?;
        registry.register(Box::new(members_created.clone()))?;

        Ok(Self {
            registry,
            signup_outcomes,
            signup_duration,
            store_retry_attempts,
            members_created,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_signup(&self, outcome: &str, duration_secs: f64) {
        self.signup_outcomes.with_label_values(&[outcome]).inc();
        self.signup_duration.observe(duration_secs);
    }

    /// Called with the 1-based attempt number; only re-attempts are counted.
    pub fn record_store_attempt(&self, operation: &str, attempt: u32) {
        if attempt > 1 {
            self.store_retry_attempts.with_label_values(&[operation]).inc();
        }
    }

    pub fn record_member_created(&self) {
        self.members_created.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_member_created();
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_signup() {
        let metrics = Metrics::new().unwrap();
        metrics.record_signup("success", 0.02);
        metrics.record_signup("duplicate", 0.01);
        metrics.record_signup("duplicate", 0.01);

        assert_eq!(metrics.signup_outcomes.with_label_values(&["success"]).get(), 1);
        assert_eq!(metrics.signup_outcomes.with_label_values(&["duplicate"]).get(), 2);
        assert_eq!(metrics.signup_duration.get_sample_count(), 3);
    }

    #[test]
    fn test_first_attempt_is_not_a_retry() {
        let metrics = Metrics::new().unwrap();
        metrics.record_store_attempt("enroll", 1);
        metrics.record_store_attempt("enroll", 2);
        metrics.record_store_attempt("enroll", 3);

        assert_eq!(metrics.store_retry_attempts.with_label_values(&["enroll"]).get(), 2);
    }
}
