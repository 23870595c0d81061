// ============================================================================
// OSA Enrollment Service
// ============================================================================
//
// Membership and event-signup backend. The interesting part is the signup
// path: a member can enroll in an event at most once, under any amount of
// concurrency, using nothing but the store's conditional create.
//
//   api      - actix-web routes and JSON shaping
//   domain   - EventCatalog, IdentityResolver, EnrollmentLedger, SignupCoordinator
//   store    - EntityStore trait, in-memory and ScyllaDB backends
//   metrics  - Prometheus registry
//   utils    - retry with exponential backoff
//
// ============================================================================

pub mod api;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod store;
pub mod utils;
