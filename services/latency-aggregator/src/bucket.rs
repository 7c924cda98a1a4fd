//! Time bucketer
//!
//! Groups accepted tick events by source and truncates each event time to the
//! configured granularity. The bucket key always comes from the event
//! timestamp, never the tick timestamp, so vendor clock skew cannot move a
//! sample into a different bucket.
//!
//! Bucket boundaries are aligned to epoch (1-minute buckets start on minute
//! boundaries). Buckets only exist once they hold a sample, so an empty bucket
//! can never reach the aggregator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tick_types::ids::SourceId;
use tick_types::tick::TickEvent;

/// Lowest timestamp whose bucket start is representable at every
/// granularity. Accepted events must never be older than this.
pub const MIN_ALIGNABLE_TIMESTAMP_MICROS: i64 = i64::MIN / 60_000_000 * 60_000_000;

/// Supported bucket widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketGranularity {
    /// 1 second
    Second,
    /// 1 minute
    Minute,
}

impl BucketGranularity {
    /// Width of this bucket in microseconds.
    pub fn duration_micros(&self) -> i64 {
        match self {
            BucketGranularity::Second => 1_000_000,
            BucketGranularity::Minute => 60 * 1_000_000,
        }
    }

    /// Align a timestamp to this granularity's boundary (floor).
    ///
    /// `timestamp_micros` must be at least `MIN_ALIGNABLE_TIMESTAMP_MICROS`.
    pub fn align_to_boundary(&self, timestamp_micros: i64) -> i64 {
        let duration = self.duration_micros();
        timestamp_micros.div_euclid(duration) * duration
    }
}

/// Latency samples of one source within one bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub start_micros: i64,
    pub samples: Vec<f64>,
}

/// All buckets of a single source, ordered by start time.
#[derive(Debug, Clone)]
pub struct SourceBuckets {
    source: SourceId,
    buckets: BTreeMap<i64, Vec<f64>>,
}

impl SourceBuckets {
    pub fn new(source: SourceId) -> Self {
        Self {
            source,
            buckets: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, bucket_start_micros: i64, latency_ms: f64) {
        self.buckets
            .entry(bucket_start_micros)
            .or_default()
            .push(latency_ms);
    }

    pub fn source(&self) -> &SourceId {
        &self.source
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn sample_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Consume into buckets in chronological order.
    pub fn into_buckets(self) -> impl Iterator<Item = Bucket> {
        self.buckets
            .into_iter()
            .map(|(start_micros, samples)| Bucket {
                start_micros,
                samples,
            })
    }
}

/// Routes accepted events into per-source bucket sets.
pub struct TimeBucketer {
    granularity: BucketGranularity,
    /// BTreeMap for deterministic source order.
    sources: BTreeMap<SourceId, SourceBuckets>,
}

impl TimeBucketer {
    pub fn new(granularity: BucketGranularity) -> Self {
        Self {
            granularity,
            sources: BTreeMap::new(),
        }
    }

    /// Append an accepted event's latency sample to its bucket.
    ///
    /// Returns the bucket start the sample landed in.
    pub fn insert(&mut self, event: &TickEvent, latency_ms: f64) -> i64 {
        let start = self.granularity.align_to_boundary(event.event_timestamp_micros);
        match self.sources.get_mut(&event.source) {
            Some(buckets) => buckets.push(start, latency_ms),
            None => {
                let mut buckets = SourceBuckets::new(event.source.clone());
                buckets.push(start, latency_ms);
                self.sources.insert(event.source.clone(), buckets);
            }
        }
        start
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn bucket_count(&self) -> usize {
        self.sources.values().map(SourceBuckets::bucket_count).sum()
    }

    /// Hand every source's buckets over to aggregation.
    pub fn into_sources(self) -> Vec<SourceBuckets> {
        self.sources.into_values().collect()
    }
}
