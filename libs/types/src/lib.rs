//! Types library for tick latency aggregation
//!
//! Core type definitions shared between the aggregation pipeline and the
//! consumers of its output table (dashboards, report exporters).
//!
//! # Modules
//! - `ids`: Tick source identifier and its display-name transform
//! - `tick`: Validated tick events and latency samples
//! - `rank`: Percentile ranks constrained to 0..=100
//! - `row`: Aggregate output rows
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod tick;
pub mod rank;
pub mod row;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::tick::*;
    pub use crate::rank::*;
    pub use crate::row::*;
    pub use crate::errors::*;
}
