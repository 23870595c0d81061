// ============================================================================
// Enrollment Domain - Signup Records
// ============================================================================
//
// An Enrollment is a child of its Member, keyed by event id:
//
//   Member:<member_id>/Enrollment:<event_id>
//
// The key alone makes (member, event) unique; the ledger never checks for an
// existing record before writing.
//
// ============================================================================

pub mod errors;
pub mod model;
pub mod ledger;

pub use errors::*;
pub use model::*;
pub use ledger::*;
