// ============================================================================
// Member Domain - Identity Resolution
// ============================================================================
//
// Maps an authenticated principal to a durable Member record:
// - Value objects (Principal, MemberId, Profile)
// - Member entity (root of its own entity group)
// - Errors (IdentityError)
// - IdentityResolver (first-contact creation, profile reads/updates)
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod model;
pub mod resolver;

pub use value_objects::*;
pub use errors::*;
pub use model::*;
pub use resolver::*;
