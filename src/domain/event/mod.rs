// ============================================================================
// Event Domain - Enrollable Activities
// ============================================================================
//
// - Value objects (EventId, TimeRange, Location)
// - Event entity and the draft submitted by authors
// - Errors (CatalogError)
// - EventCatalog (validation for signups, listing, authoring)
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod model;
pub mod catalog;

pub use value_objects::*;
pub use errors::*;
pub use model::*;
pub use catalog::*;
