//! Error types shared across the workspace
//!
//! Error taxonomy using thiserror

use thiserror::Error;

/// Percentile rank errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RankError {
    #[error("Percentile rank out of range: {0} (expected 0..=100)")]
    OutOfRange(u32),

    #[error("Invalid percentile rank: {0}")]
    Invalid(String),
}
