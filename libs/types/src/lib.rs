//! Types library for ball-by-ball cricket scoring
//!
//! This library provides the core type definitions shared by the scoring
//! services: identifiers, the delivery data model, innings and match
//! lifecycle types, ball-count numerics and the error taxonomy.
//!
//! # Version
//! v1.0.0
//!
//! # Modules
//! - `ids`: Unique identifiers (MatchId, InningsId, DeliveryId, PlayerId, TeamId)
//! - `numeric`: Ball counts and 2dp decimal rates
//! - `delivery`: Delivery, draft, outcome and correction patch types
//! - `innings`: Innings metadata, closure and summaries
//! - `fixture`: Match format, toss, status and result
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod numeric;
pub mod delivery;
pub mod innings;
pub mod fixture;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::delivery::*;
    pub use crate::innings::*;
    pub use crate::fixture::*;
    pub use crate::errors::*;
}
