//! Aggregation pass driver
//!
//! Streams records from any `BufRead` producer through parse → filter →
//! bucket, then aggregates each source's buckets on the rayon pool and merges
//! the results into one table.
//!
//! Only the line being processed is held in memory; after ingest the pass
//! retains one `f64` per accepted event. Per-source workers share nothing but
//! the cancel flag, and the table order is fixed by its sort, so the join
//! order of workers never shows in the output.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, error, info};

use crate::aggregate::{LatencyAggregator, SourceOutcome};
use crate::bucket::TimeBucketer;
use crate::config::{ConfigError, PipelineConfig};
use crate::filter::{FilterVerdict, ValidityFilter};
use crate::metrics::{PipelineStats, StatsSnapshot};
use crate::record::parse_record;
use crate::table::{AggregateTable, TableBuilder};

/// Fatal pass errors. Per-record problems never end up here.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("IO error reading tick log: {0}")]
    Io(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("no logPath configured")]
    MissingLogPath,
}

/// Cooperative cancellation shared between the caller and the workers.
///
/// A cancel applies to the pass that is running when it is raised, or to the
/// next pass if none is running. Every pass clears the flag when it ends.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Clears the cancel flag on every exit path of a pass.
struct PassScope<'a>(&'a CancelFlag);

impl Drop for PassScope<'_> {
    fn drop(&mut self) {
        self.0.reset();
    }
}

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStatus {
    Completed,
    /// Stopped early; the table holds only fully finalized buckets.
    Cancelled,
}

/// Everything a pass hands back to the caller.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub table: AggregateTable,
    pub stats: StatsSnapshot,
    pub status: PassStatus,
    pub duration_ms: u128,
}

impl PassReport {
    pub fn is_cancelled(&self) -> bool {
        self.status == PassStatus::Cancelled
    }
}

/// Runs aggregation passes for one configuration.
///
/// Deterministic: identical input and config produce a bit-identical table.
pub struct LatencyPipeline {
    config: PipelineConfig,
    filter: ValidityFilter,
    aggregator: LatencyAggregator,
    cancel: CancelFlag,
}

impl LatencyPipeline {
    /// Validate the config and build the pipeline.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        info!(
            granularity = ?config.bucket_granularity,
            heartbeat_sources = config.heartbeat_sources.len(),
            outlier_ceiling_ms = config.outlier_ceiling_ms,
            ranks = config.percentile_ranks.len(),
            max_records = ?config.max_records_to_process,
            "LatencyPipeline initialized"
        );

        Ok(Self {
            filter: ValidityFilter::new(&config),
            aggregator: LatencyAggregator::new(config.percentile_ranks.iter().copied()),
            cancel: CancelFlag::new(),
            config,
        })
    }

    /// Create a pipeline with default configuration.
    pub fn with_defaults() -> Self {
        let config = PipelineConfig::default();
        Self {
            filter: ValidityFilter::new(&config),
            aggregator: LatencyAggregator::new(config.percentile_ranks.iter().copied()),
            cancel: CancelFlag::new(),
            config,
        }
    }

    /// Share an externally owned cancel flag.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle the caller can use to cancel a running pass.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Open `logPath` and run a pass over it.
    pub fn run_log_file(&self) -> Result<PassReport, PipelineError> {
        let path = self
            .config
            .log_path
            .as_ref()
            .ok_or(PipelineError::MissingLogPath)?;

        let file = File::open(path).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to open tick log");
            e
        })?;
        self.run_reader(BufReader::new(file))
    }

    /// Run a pass over a streaming reader. An I/O error aborts the pass;
    /// no partial table is returned.
    pub fn run_reader<R: BufRead>(&self, mut reader: R) -> Result<PassReport, PipelineError> {
        let _scope = PassScope(&self.cancel);
        let start = Instant::now();
        let stats = PipelineStats::new();
        let mut bucketer = TimeBucketer::new(self.config.bucket_granularity);
        let mut buf = Vec::with_capacity(512);

        info!("Starting aggregation pass");

        loop {
            if self.limit_reached(&stats) {
                break;
            }
            if self.cancel.is_cancelled() {
                return Ok(self.cancelled_during_ingest(&stats, start));
            }

            buf.clear();
            let read = reader.read_until(b'\n', &mut buf).map_err(|e| {
                error!(
                    error = %e,
                    records_seen = stats.snapshot().records_seen,
                    "IO failure while reading tick log, aborting pass"
                );
                e
            })?;
            if read == 0 {
                break;
            }

            let line = String::from_utf8_lossy(&buf);
            self.ingest_line(&line, &mut bucketer, &stats);
        }

        Ok(self.finish(bucketer, &stats, start))
    }

    /// Run a pass over in-memory lines.
    pub fn run_lines<I, S>(&self, lines: I) -> PassReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let _scope = PassScope(&self.cancel);
        let start = Instant::now();
        let stats = PipelineStats::new();
        let mut bucketer = TimeBucketer::new(self.config.bucket_granularity);

        for line in lines {
            if self.limit_reached(&stats) {
                break;
            }
            if self.cancel.is_cancelled() {
                return self.cancelled_during_ingest(&stats, start);
            }
            self.ingest_line(line.as_ref(), &mut bucketer, &stats);
        }

        self.finish(bucketer, &stats, start)
    }

    fn limit_reached(&self, stats: &PipelineStats) -> bool {
        match self.config.max_records_to_process {
            Some(limit) => stats.records_seen.load(Ordering::Relaxed) >= limit,
            None => false,
        }
    }

    /// Parse, filter and bucket one line. Blank lines are not records.
    fn ingest_line(&self, line: &str, bucketer: &mut TimeBucketer, stats: &PipelineStats) {
        if line.trim().is_empty() {
            return;
        }
        stats.record_seen();

        let parsed = parse_record(line);
        stats.record_rejected_tokens(parsed.rejected.len() as u64);

        let event = match parsed.candidate.complete() {
            Ok(event) => event,
            Err(err) => {
                stats.record_incomplete();
                debug!(error = %err, "Dropping incomplete record");
                return;
            }
        };
        stats.record_parsed();

        match self.filter.check(&event) {
            FilterVerdict::Accept { latency_ms } => {
                bucketer.insert(&event, latency_ms);
                stats.record_accepted();
            }
            FilterVerdict::Drop(reason) => {
                stats.record_dropped(reason);
                debug!(
                    source = %event.source,
                    reason = reason.label(),
                    event_time = ?event.event_time(),
                    "Dropping tick event"
                );
            }
        }
    }

    fn cancelled_during_ingest(&self, stats: &PipelineStats, start: Instant) -> PassReport {
        info!(
            records_seen = stats.snapshot().records_seen,
            "Pass cancelled during ingest"
        );
        PassReport {
            table: AggregateTable::default(),
            stats: stats.snapshot(),
            status: PassStatus::Cancelled,
            duration_ms: start.elapsed().as_millis(),
        }
    }

    /// Aggregate every source in parallel and publish the table.
    fn finish(&self, bucketer: TimeBucketer, stats: &PipelineStats, start: Instant) -> PassReport {
        let sources = bucketer.into_sources();
        let source_count = sources.len();

        let outcomes: Vec<SourceOutcome> = sources
            .into_par_iter()
            .map(|buckets| {
                let outcome = self.aggregator.aggregate_source(buckets, &self.cancel);
                stats.record_buckets_emitted(outcome.rows.len() as u64);
                outcome
            })
            .collect();

        let mut builder = TableBuilder::new();
        let mut cancelled = false;
        for outcome in outcomes {
            cancelled |= outcome.cancelled;
            builder.extend(outcome.rows);
        }
        let table = builder.build();

        let status = if cancelled {
            PassStatus::Cancelled
        } else {
            PassStatus::Completed
        };
        let snapshot = stats.snapshot();
        let duration_ms = start.elapsed().as_millis();

        info!(
            records_seen = snapshot.records_seen,
            records_parsed = snapshot.records_parsed,
            events_accepted = snapshot.events_accepted,
            dropped = snapshot.total_dropped(),
            sources = source_count,
            rows = table.len(),
            status = ?status,
            duration_ms,
            "Aggregation pass finished"
        );

        PassReport {
            table,
            stats: snapshot,
            status,
            duration_ms,
        }
    }
}
