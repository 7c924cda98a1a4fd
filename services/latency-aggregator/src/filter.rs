//! Validity filter
//!
//! Decides whether a complete tick event may contribute to any statistic.
//! Checks run in a fixed order and the first match is the counted reason:
//!
//! 1. Sentinel: event timestamp before the minimum plausible timestamp
//!    (an unset field read as epoch, i.e. calendar year 1970).
//! 2. Heartbeat: the source is a configured keepalive pseudo-source.
//! 3. Outlier: latency strictly above the configured ceiling. A sample
//!    exactly at the ceiling is kept.

use std::collections::BTreeSet;

use tick_types::tick::TickEvent;

use crate::config::PipelineConfig;

/// Why an event was excluded. Diagnostics, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DropReason {
    Sentinel,
    Heartbeat,
    Outlier,
}

impl DropReason {
    pub fn label(&self) -> &'static str {
        match self {
            DropReason::Sentinel => "sentinel",
            DropReason::Heartbeat => "heartbeat",
            DropReason::Outlier => "outlier",
        }
    }
}

/// Outcome of filtering one event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterVerdict {
    /// Event kept; carries its latency sample so it is computed once.
    Accept { latency_ms: f64 },
    Drop(DropReason),
}

/// Stateless event filter built from a `PipelineConfig`.
#[derive(Debug, Clone)]
pub struct ValidityFilter {
    min_plausible_timestamp_micros: i64,
    heartbeat_sources: BTreeSet<String>,
    outlier_ceiling_ms: f64,
}

impl ValidityFilter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            min_plausible_timestamp_micros: config.min_plausible_timestamp_micros,
            heartbeat_sources: config.heartbeat_sources.clone(),
            outlier_ceiling_ms: config.outlier_ceiling_ms,
        }
    }

    pub fn check(&self, event: &TickEvent) -> FilterVerdict {
        if event.event_timestamp_micros < self.min_plausible_timestamp_micros {
            return FilterVerdict::Drop(DropReason::Sentinel);
        }
        if self.heartbeat_sources.contains(event.source.as_str()) {
            return FilterVerdict::Drop(DropReason::Heartbeat);
        }

        let latency_ms = event.latency_ms();
        if latency_ms > self.outlier_ceiling_ms {
            return FilterVerdict::Drop(DropReason::Outlier);
        }

        FilterVerdict::Accept { latency_ms }
    }
}
