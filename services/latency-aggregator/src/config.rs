//! Pipeline configuration
//!
//! `PipelineConfig` is deserializable with camelCase keys so an external
//! loader (file, CLI, dashboard form) can hand it over as JSON. Every field
//! has a default; `validate()` is run before a pass starts.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tick_types::rank::{default_ranks, PercentileRank};

use crate::bucket::{BucketGranularity, MIN_ALIGNABLE_TIMESTAMP_MICROS};

/// Default outlier ceiling in milliseconds.
pub const DEFAULT_OUTLIER_CEILING_MS: f64 = 1500.0;

/// 1971-01-01T00:00:00Z in Unix microseconds. Anything earlier is an unset
/// timestamp that was read as epoch.
pub const DEFAULT_MIN_PLAUSIBLE_TIMESTAMP_MICROS: i64 = 365 * 86_400 * 1_000_000;

/// Errors raised by configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("outlier ceiling must be a finite, non-negative number of ms, got {0}")]
    InvalidOutlierCeiling(f64),

    #[error("at least one percentile rank must be configured")]
    NoPercentileRanks,

    #[error("maxRecordsToProcess must be greater than zero when set")]
    ZeroRecordLimit,

    #[error("minPlausibleTimestampMicros {0} is below the earliest alignable bucket start")]
    TimestampFloorTooLow(i64),

    #[error("malformed configuration: {0}")]
    Malformed(String),
}

/// Configuration for one aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Log file read by `LatencyPipeline::run_log_file`.
    pub log_path: Option<PathBuf>,
    /// Width of each time bucket.
    pub bucket_granularity: BucketGranularity,
    /// Keepalive pseudo-sources that carry no latency signal.
    pub heartbeat_sources: BTreeSet<String>,
    /// Samples strictly above this are dropped as outliers.
    pub outlier_ceiling_ms: f64,
    /// Ranks computed for every bucket, ascending.
    pub percentile_ranks: BTreeSet<PercentileRank>,
    /// Stop after this many input records.
    pub max_records_to_process: Option<u64>,
    /// Event timestamps before this are sentinel values.
    pub min_plausible_timestamp_micros: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            bucket_granularity: BucketGranularity::Second,
            heartbeat_sources: BTreeSet::new(),
            outlier_ceiling_ms: DEFAULT_OUTLIER_CEILING_MS,
            percentile_ranks: default_ranks().into_iter().collect(),
            max_records_to_process: None,
            min_plausible_timestamp_micros: DEFAULT_MIN_PLAUSIBLE_TIMESTAMP_MICROS,
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_granularity(mut self, granularity: BucketGranularity) -> Self {
        self.bucket_granularity = granularity;
        self
    }

    pub fn with_heartbeat_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.heartbeat_sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_outlier_ceiling_ms(mut self, ceiling_ms: f64) -> Self {
        self.outlier_ceiling_ms = ceiling_ms;
        self
    }

    pub fn with_percentile_ranks<I>(mut self, ranks: I) -> Self
    where
        I: IntoIterator<Item = PercentileRank>,
    {
        self.percentile_ranks = ranks.into_iter().collect();
        self
    }

    pub fn with_max_records(mut self, limit: u64) -> Self {
        self.max_records_to_process = Some(limit);
        self
    }

    pub fn with_min_plausible_timestamp_micros(mut self, floor_micros: i64) -> Self {
        self.min_plausible_timestamp_micros = floor_micros;
        self
    }

    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Reject configurations that would make every statistic meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.outlier_ceiling_ms.is_finite() || self.outlier_ceiling_ms < 0.0 {
            return Err(ConfigError::InvalidOutlierCeiling(self.outlier_ceiling_ms));
        }
        if self.percentile_ranks.is_empty() {
            return Err(ConfigError::NoPercentileRanks);
        }
        if self.max_records_to_process == Some(0) {
            return Err(ConfigError::ZeroRecordLimit);
        }
        if self.min_plausible_timestamp_micros < MIN_ALIGNABLE_TIMESTAMP_MICROS {
            return Err(ConfigError::TimestampFloorTooLow(
                self.min_plausible_timestamp_micros,
            ));
        }
        Ok(())
    }
}
