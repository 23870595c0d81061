// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each component has its own subdirectory with value objects, errors, the
// stored model, and the service that operates on it. Leaf first:
//
// - event      - EventCatalog: does the event exist and accept signups?
// - member     - IdentityResolver: principal -> Member, created on first use
// - enrollment - EnrollmentLedger: at most one Enrollment per (member, event)
// - signup     - SignupCoordinator: orchestrates the three above
//
// This layer only talks to storage through the EntityStore trait.
//
// ============================================================================

pub mod event;
pub mod member;
pub mod enrollment;
pub mod signup;
