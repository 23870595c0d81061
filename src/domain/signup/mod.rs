// ============================================================================
// Signup Domain - "member X enrolls in event Y"
// ============================================================================
//
// Orchestrates: authenticate -> validate event -> resolve member -> enroll.
// Every step is idempotent, so a caller may retry a whole request after a
// RetryableFailure without risking a second enrollment.
//
// ============================================================================

pub mod errors;
pub mod coordinator;

pub use errors::*;
pub use coordinator::*;
