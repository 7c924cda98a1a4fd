//! Tick Latency Aggregator
//!
//! Consumes captured tick logs and produces a time-bucketed, per-source
//! latency table:
//! - Record parsing of `tag:value` token lines
//! - Sentinel, heartbeat and outlier filtering with per-reason counters
//! - Event-time bucketing (second or minute)
//! - Max latency and interpolated percentiles per (source, bucket)
//! - One deterministically ordered output table
//!
//! # Architecture
//!
//! ```text
//!   raw lines (BufRead)
//!        │
//!    ┌───▼───┐
//!    │Record │  ← tokenize tag:value pairs
//!    └───┬───┘
//!    ┌───▼───┐
//!    │Filter │  ← sentinel / heartbeat / outlier
//!    └───┬───┘
//!    ┌───▼────┐
//!    │Bucketer│  ← per source, event-time aligned
//!    └───┬────┘
//!        │
//!   ┌────┴─────┬────────────┐
//!   │          │            │
//! ┌─▼───┐  ┌───▼─┐      ┌───▼─┐
//! │Agg A│  │Agg B│ ...  │Agg N│  ← one rayon task per source
//! └─┬───┘  └───┬─┘      └───┬─┘
//!   │          │            │
//! ┌─▼──────────▼────────────▼─┐
//! │       Table Builder       │
//! └───────────────────────────┘
//! ```

pub mod aggregate;
pub mod bucket;
pub mod config;
pub mod filter;
pub mod metrics;
pub mod pipeline;
pub mod record;
pub mod table;

pub use config::PipelineConfig;
pub use pipeline::{CancelFlag, LatencyPipeline, PassReport, PassStatus, PipelineError};
pub use table::AggregateTable;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
