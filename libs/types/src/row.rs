//! Aggregate output rows
//!
//! One row per (bucket, source) pair that received at least one valid sample.
//! Rows are immutable once emitted and are the unit handed to presentation
//! and export collaborators.

use crate::ids::SourceId;
use crate::rank::PercentileRank;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Latency summary for one source within one time bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    /// Bucket start, Unix microseconds (aligned to the bucket granularity)
    pub bucket_start_micros: i64,
    /// Raw source id
    pub source: SourceId,
    /// Display name derived from `source`
    pub source_display_name: String,
    pub max_latency_ms: f64,
    pub percentiles: BTreeMap<PercentileRank, f64>,
    /// Number of samples that fed this row
    pub sample_count: u64,
}

impl AggregateRow {
    pub fn new(
        bucket_start_micros: i64,
        source: SourceId,
        max_latency_ms: f64,
        percentiles: BTreeMap<PercentileRank, f64>,
        sample_count: u64,
    ) -> Self {
        let source_display_name = source.display_name();
        Self {
            bucket_start_micros,
            source,
            source_display_name,
            max_latency_ms,
            percentiles,
            sample_count,
        }
    }

    /// Bucket start as a UTC datetime, if representable
    pub fn bucket_start(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_micros(self.bucket_start_micros)
    }

    /// Value at the given rank, if that rank was configured
    pub fn percentile(&self, rank: PercentileRank) -> Option<f64> {
        self.percentiles.get(&rank).copied()
    }

    /// Max dominates every percentile and percentiles never decrease with
    /// rank.
    pub fn is_consistent(&self) -> bool {
        let mut prev = f64::NEG_INFINITY;
        for value in self.percentiles.values() {
            if *value < prev || *value > self.max_latency_ms {
                return false;
            }
            prev = *value;
        }
        self.sample_count > 0
    }
}
