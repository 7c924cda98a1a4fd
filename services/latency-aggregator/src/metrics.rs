//! Pipeline diagnostics
//!
//! Counts every record from the moment it is read until it either lands in a
//! bucket or is dropped, with one counter per drop reason, so large-scale
//! silent data loss shows up in the numbers instead of in a thin chart.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::filter::DropReason;

/// Counters for one aggregation pass.
#[derive(Debug, Default)]
pub struct PipelineStats {
    // Input
    pub records_seen: AtomicU64,
    pub records_parsed: AtomicU64,
    pub tokens_rejected: AtomicU64,

    // Drops
    pub dropped_incomplete: AtomicU64,
    pub dropped_sentinel: AtomicU64,
    pub dropped_heartbeat: AtomicU64,
    pub dropped_outlier: AtomicU64,

    // Output
    pub events_accepted: AtomicU64,
    pub buckets_emitted: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_seen(&self) {
        self.records_seen.fetch_add(1, Ordering::Relaxed);
    }

    /// A record that resolved every field.
    pub fn record_parsed(&self) {
        self.records_parsed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_tokens(&self, count: u64) {
        if count > 0 {
            self.tokens_rejected.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn record_incomplete(&self) {
        self.dropped_incomplete.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, reason: DropReason) {
        let counter = match reason {
            DropReason::Sentinel => &self.dropped_sentinel,
            DropReason::Heartbeat => &self.dropped_heartbeat,
            DropReason::Outlier => &self.dropped_outlier,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.events_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_buckets_emitted(&self, count: u64) {
        self.buckets_emitted.fetch_add(count, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            records_seen: self.records_seen.load(Ordering::Relaxed),
            records_parsed: self.records_parsed.load(Ordering::Relaxed),
            tokens_rejected: self.tokens_rejected.load(Ordering::Relaxed),
            dropped_incomplete: self.dropped_incomplete.load(Ordering::Relaxed),
            dropped_sentinel: self.dropped_sentinel.load(Ordering::Relaxed),
            dropped_heartbeat: self.dropped_heartbeat.load(Ordering::Relaxed),
            dropped_outlier: self.dropped_outlier.load(Ordering::Relaxed),
            events_accepted: self.events_accepted.load(Ordering::Relaxed),
            buckets_emitted: self.buckets_emitted.load(Ordering::Relaxed),
        }
    }

    /// Export counters as a BTreeMap for exposition.
    pub fn export(&self) -> BTreeMap<String, u64> {
        self.snapshot().export()
    }

    /// Check loss thresholds and generate alerts.
    pub fn check_thresholds(&self, thresholds: &LossThresholds) -> Vec<Alert> {
        self.snapshot().check_thresholds(thresholds)
    }
}

/// Plain copy of the pass counters, handed to the caller with the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub records_seen: u64,
    pub records_parsed: u64,
    pub tokens_rejected: u64,
    pub dropped_incomplete: u64,
    pub dropped_sentinel: u64,
    pub dropped_heartbeat: u64,
    pub dropped_outlier: u64,
    pub events_accepted: u64,
    pub buckets_emitted: u64,
}

impl StatsSnapshot {
    /// Records dropped for any reason.
    pub fn total_dropped(&self) -> u64 {
        self.dropped_incomplete
            + self.dropped_sentinel
            + self.dropped_heartbeat
            + self.dropped_outlier
    }

    pub fn dropped_by(&self, reason: DropReason) -> u64 {
        match reason {
            DropReason::Sentinel => self.dropped_sentinel,
            DropReason::Heartbeat => self.dropped_heartbeat,
            DropReason::Outlier => self.dropped_outlier,
        }
    }

    /// Share of seen records that never reached a bucket. Heartbeats are
    /// expected traffic and do not count as loss.
    pub fn loss_ratio(&self) -> f64 {
        let eligible = self.records_seen.saturating_sub(self.dropped_heartbeat);
        if eligible == 0 {
            return 0.0;
        }
        let lost = self.total_dropped() - self.dropped_heartbeat;
        lost as f64 / eligible as f64
    }

    /// Every seen record is either accepted or dropped for one reason.
    pub fn is_balanced(&self) -> bool {
        self.records_seen == self.events_accepted + self.total_dropped()
    }

    pub fn export(&self) -> BTreeMap<String, u64> {
        let mut m = BTreeMap::new();
        m.insert("records_seen".to_string(), self.records_seen);
        m.insert("records_parsed".to_string(), self.records_parsed);
        m.insert("tokens_rejected".to_string(), self.tokens_rejected);
        m.insert("dropped_incomplete".to_string(), self.dropped_incomplete);
        m.insert("dropped_sentinel".to_string(), self.dropped_sentinel);
        m.insert("dropped_heartbeat".to_string(), self.dropped_heartbeat);
        m.insert("dropped_outlier".to_string(), self.dropped_outlier);
        m.insert("events_accepted".to_string(), self.events_accepted);
        m.insert("buckets_emitted".to_string(), self.buckets_emitted);
        m
    }

    pub fn check_thresholds(&self, thresholds: &LossThresholds) -> Vec<Alert> {
        let mut alerts = Vec::new();

        let ratio = self.loss_ratio();
        if ratio > thresholds.max_loss_ratio {
            alerts.push(Alert {
                level: AlertLevel::Critical,
                metric: "loss_ratio".to_string(),
                message: format!(
                    "Loss ratio: {:.4} > threshold {:.4}",
                    ratio, thresholds.max_loss_ratio
                ),
            });
        }

        if self.tokens_rejected > thresholds.max_tokens_rejected {
            alerts.push(Alert {
                level: AlertLevel::Warning,
                metric: "tokens_rejected".to_string(),
                message: format!(
                    "Tokens rejected: {} > threshold {}",
                    self.tokens_rejected, thresholds.max_tokens_rejected
                ),
            });
        }

        if self.records_seen > 0 && self.events_accepted == 0 {
            alerts.push(Alert {
                level: AlertLevel::Critical,
                metric: "events_accepted".to_string(),
                message: format!("No events accepted out of {} records", self.records_seen),
            });
        }

        for alert in &alerts {
            warn!(metric = %alert.metric, level = ?alert.level, "{}", alert.message);
        }

        alerts
    }
}

/// Alert severity level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertLevel {
    Warning,
    Critical,
}

/// An alert triggered by threshold breach.
#[derive(Debug, Clone)]
pub struct Alert {
    pub level: AlertLevel,
    pub metric: String,
    pub message: String,
}

/// Configurable data-loss thresholds.
#[derive(Debug, Clone)]
pub struct LossThresholds {
    /// Max share of non-heartbeat records that may be dropped.
    pub max_loss_ratio: f64,
    /// Max malformed tokens before a warning.
    pub max_tokens_rejected: u64,
}

impl Default for LossThresholds {
    fn default() -> Self {
        Self {
            max_loss_ratio: 0.05,
            max_tokens_rejected: 100,
        }
    }
}
