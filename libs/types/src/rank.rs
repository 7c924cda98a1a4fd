//! Percentile rank type
//!
//! Ranks are integers in 0..=100. Rank 0 is the minimum of a distribution and
//! rank 100 its maximum.

use crate::errors::RankError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Integer percentile rank constrained to 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u8")]
pub struct PercentileRank(u8);

impl PercentileRank {
    pub const MEDIAN: PercentileRank = PercentileRank(50);
    pub const MAX: PercentileRank = PercentileRank(100);

    /// Create a rank, rejecting values above 100
    pub fn new(rank: u32) -> Result<Self, RankError> {
        if rank > 100 {
            return Err(RankError::OutOfRange(rank));
        }
        Ok(Self(rank as u8))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Rank as a fraction in [0, 1]
    pub fn fraction(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

/// Default rank set: 50, 55, ..., 95 plus 99.
pub fn default_ranks() -> Vec<PercentileRank> {
    (50..=95)
        .step_by(5)
        .chain(std::iter::once(99))
        .map(PercentileRank)
        .collect()
}

impl TryFrom<u32> for PercentileRank {
    type Error = RankError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PercentileRank> for u8 {
    fn from(rank: PercentileRank) -> Self {
        rank.0
    }
}

impl FromStr for PercentileRank {
    type Err = RankError;

    /// Accepts `50` or `p50` / `P50`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('p')
            .or_else(|| trimmed.strip_prefix('P'))
            .unwrap_or(trimmed);
        let value: u32 = digits
            .parse()
            .map_err(|_| RankError::Invalid(s.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for PercentileRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_bounds() {
        assert!(PercentileRank::new(0).is_ok());
        assert!(PercentileRank::new(100).is_ok());
        assert_eq!(PercentileRank::new(101), Err(RankError::OutOfRange(101)));
    }

    #[test]
    fn test_default_ranks() {
        let ranks: Vec<u8> = default_ranks().iter().map(|r| r.value()).collect();
        assert_eq!(ranks, vec![50, 55, 60, 65, 70, 75, 80, 85, 90, 95, 99]);
    }

    #[test]
    fn test_rank_from_str() {
        assert_eq!("50".parse::<PercentileRank>().unwrap(), PercentileRank::MEDIAN);
        assert_eq!("p99".parse::<PercentileRank>().unwrap().value(), 99);
        assert_eq!("P100".parse::<PercentileRank>().unwrap(), PercentileRank::MAX);
        assert!("p-1".parse::<PercentileRank>().is_err());
        assert!("150".parse::<PercentileRank>().is_err());
    }

    #[test]
    fn test_rank_serde() {
        let json = serde_json::to_string(&PercentileRank::MEDIAN).unwrap();
        assert_eq!(json, "50");

        let rank: PercentileRank = serde_json::from_str("95").unwrap();
        assert_eq!(rank.value(), 95);

        assert!(serde_json::from_str::<PercentileRank>("101").is_err());
    }

    #[test]
    fn test_rank_display() {
        assert_eq!(PercentileRank::MEDIAN.to_string(), "P50");
        assert_eq!(PercentileRank::MAX.fraction(), 1.0);
    }
}
