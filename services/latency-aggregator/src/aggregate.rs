//! Latency aggregator
//!
//! Summarizes the samples of one (source, bucket) pair into a max latency and
//! a set of percentile values.
//!
//! Percentiles use linear interpolation between order statistics over the
//! sorted samples, for every rank including 0 and 100:
//!
//! ```text
//! pos = r / 100 * (n - 1)
//! v   = s[floor(pos)] + (s[ceil(pos)] - s[floor(pos)]) * (pos - floor(pos))
//! ```
//!
//! The interpolated value is clamped to its two order statistics so float
//! rounding can never break monotonicity or push a percentile above the max.

use std::collections::BTreeMap;

use tick_types::ids::SourceId;
use tick_types::rank::PercentileRank;
use tick_types::row::AggregateRow;

use crate::bucket::{Bucket, SourceBuckets};
use crate::pipeline::CancelFlag;

/// Percentile of an ascending, non-empty sample slice.
///
/// Returns `None` for an empty slice.
pub fn percentile(sorted: &[f64], rank: PercentileRank) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let pos = rank.fraction() * last as f64;
    let lower = pos.floor() as usize;
    let upper = (pos.ceil() as usize).min(last);

    let lo = sorted[lower];
    let hi = sorted[upper];
    if lower == upper {
        return Some(lo);
    }

    let frac = pos - lower as f64;
    Some((lo + (hi - lo) * frac).clamp(lo, hi))
}

/// Max and percentiles of one bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySummary {
    pub max_latency_ms: f64,
    pub percentiles: BTreeMap<PercentileRank, f64>,
    pub sample_count: u64,
}

/// Summarize a sample set. Sorting happens here, so the result does not
/// depend on arrival order. `None` for an empty set.
pub fn summarize(mut samples: Vec<f64>, ranks: &[PercentileRank]) -> Option<LatencySummary> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_unstable_by(f64::total_cmp);

    let max_latency_ms = *samples.last()?;
    let mut percentiles = BTreeMap::new();
    for &rank in ranks {
        if let Some(value) = percentile(&samples, rank) {
            percentiles.insert(rank, value);
        }
    }

    Some(LatencySummary {
        max_latency_ms,
        percentiles,
        sample_count: samples.len() as u64,
    })
}

/// Rows produced for one source.
#[derive(Debug, Clone, Default)]
pub struct SourceOutcome {
    pub rows: Vec<AggregateRow>,
    /// Aggregation stopped at a bucket boundary because of cancellation.
    pub cancelled: bool,
}

/// Turns bucket sample sets into aggregate rows.
#[derive(Debug, Clone)]
pub struct LatencyAggregator {
    ranks: Vec<PercentileRank>,
}

impl LatencyAggregator {
    pub fn new<I>(ranks: I) -> Self
    where
        I: IntoIterator<Item = PercentileRank>,
    {
        let mut ranks: Vec<PercentileRank> = ranks.into_iter().collect();
        ranks.sort_unstable();
        ranks.dedup();
        Self { ranks }
    }

    pub fn ranks(&self) -> &[PercentileRank] {
        &self.ranks
    }

    /// One row for a non-empty bucket, nothing for an empty one.
    pub fn aggregate_bucket(&self, source: &SourceId, bucket: Bucket) -> Option<AggregateRow> {
        let summary = summarize(bucket.samples, &self.ranks)?;
        Some(AggregateRow::new(
            bucket.start_micros,
            source.clone(),
            summary.max_latency_ms,
            summary.percentiles,
            summary.sample_count,
        ))
    }

    /// Aggregate every bucket of one source in chronological order.
    ///
    /// The cancel flag is checked before each bucket; rows already finalized
    /// are kept and no partial bucket is emitted.
    pub fn aggregate_source(&self, buckets: SourceBuckets, cancel: &CancelFlag) -> SourceOutcome {
        let source = buckets.source().clone();
        self.aggregate_buckets(&source, buckets.into_buckets(), cancel)
    }

    /// Aggregate an ordered bucket stream for `source`, stopping at the first
    /// bucket boundary after `cancel` is raised.
    pub fn aggregate_buckets<I>(
        &self,
        source: &SourceId,
        buckets: I,
        cancel: &CancelFlag,
    ) -> SourceOutcome
    where
        I: IntoIterator<Item = Bucket>,
    {
        let mut outcome = SourceOutcome::default();

        for bucket in buckets {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }
            if let Some(row) = self.aggregate_bucket(source, bucket) {
                outcome.rows.push(row);
            }
        }

        outcome
    }
}
