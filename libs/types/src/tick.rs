//! Validated tick events
//!
//! A `TickEvent` pairs the application-side event time with the
//! vendor-reported tick time for one market-data update. Both timestamps are
//! Unix microseconds.

use crate::ids::SourceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Microseconds per millisecond
pub const MICROS_PER_MILLI: f64 = 1_000.0;

/// One tick with both timestamps resolved
///
/// Built once from a raw record and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvent {
    pub source: SourceId,
    /// When the application received/processed the tick (Unix micros)
    pub event_timestamp_micros: i64,
    /// Timestamp embedded by the originating source (Unix micros)
    pub tick_timestamp_micros: i64,
}

impl TickEvent {
    pub fn new(
        source: SourceId,
        event_timestamp_micros: i64,
        tick_timestamp_micros: i64,
    ) -> Self {
        Self {
            source,
            event_timestamp_micros,
            tick_timestamp_micros,
        }
    }

    /// Absolute event/tick difference in milliseconds.
    pub fn latency_ms(&self) -> f64 {
        latency_ms(self.event_timestamp_micros, self.tick_timestamp_micros)
    }

    /// Event time as a UTC datetime, if representable
    pub fn event_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_micros(self.event_timestamp_micros)
    }
}

/// `|event - tick| / 1000`, computed without signed overflow.
pub fn latency_ms(event_timestamp_micros: i64, tick_timestamp_micros: i64) -> f64 {
    event_timestamp_micros.abs_diff(tick_timestamp_micros) as f64 / MICROS_PER_MILLI
}
