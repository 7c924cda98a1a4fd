//! Aggregate table builder
//!
//! Merges per-source rows into one table ordered by bucket start, then
//! display name, then raw source id. The order depends only on row content,
//! never on the order in which workers finished. Once built the table is
//! read-only.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};
use tick_types::ids::SourceId;
use tick_types::row::AggregateRow;

/// Collects rows from any number of workers.
#[derive(Debug, Default)]
pub struct TableBuilder {
    rows: Vec<AggregateRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend<I>(&mut self, rows: I)
    where
        I: IntoIterator<Item = AggregateRow>,
    {
        self.rows.extend(rows);
    }

    /// Sort and publish.
    pub fn build(mut self) -> AggregateTable {
        self.rows.sort_by(|a, b| {
            a.bucket_start_micros
                .cmp(&b.bucket_start_micros)
                .then_with(|| a.source_display_name.cmp(&b.source_display_name))
                .then_with(|| a.source.cmp(&b.source))
        });
        AggregateTable { rows: self.rows }
    }
}

/// Published, immutable aggregate table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateTable {
    rows: Vec<AggregateRow>,
}

impl AggregateTable {
    /// All rows in table order.
    pub fn rows(&self) -> &[AggregateRow] {
        &self.rows
    }

    /// Rows whose raw source id or display name equals `source`.
    /// An unknown source yields an empty result.
    pub fn rows_for_source(&self, source: &str) -> Vec<&AggregateRow> {
        self.rows
            .iter()
            .filter(|row| row.source.as_str() == source || row.source_display_name == source)
            .collect()
    }

    /// Rows with `start <= bucket_start < end` (Unix micros).
    pub fn rows_in_range(&self, start_micros: i64, end_micros: i64) -> &[AggregateRow] {
        let lo = self
            .rows
            .partition_point(|row| row.bucket_start_micros < start_micros);
        let hi = self
            .rows
            .partition_point(|row| row.bucket_start_micros < end_micros);
        if lo >= hi {
            return &[];
        }
        &self.rows[lo..hi]
    }

    /// Distinct sources present in the table.
    pub fn sources(&self) -> BTreeSet<SourceId> {
        self.rows.iter().map(|row| row.source.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Give the rows to the caller.
    pub fn into_rows(self) -> Vec<AggregateRow> {
        self.rows
    }

    /// SHA-256 over the exact bit patterns of every row, for comparing runs.
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();

        for row in &self.rows {
            hasher.update(row.bucket_start_micros.to_be_bytes());
            hasher.update(b"|");
            hasher.update(row.source.as_str().as_bytes());
            hasher.update(b"|");
            hasher.update(row.max_latency_ms.to_bits().to_be_bytes());
            hasher.update(row.sample_count.to_be_bytes());
            for (rank, value) in &row.percentiles {
                hasher.update([rank.value()]);
                hasher.update(b":");
                hasher.update(value.to_bits().to_be_bytes());
                hasher.update(b",");
            }
            hasher.update(b"===");
        }

        format!("{:x}", hasher.finalize())
    }

    /// JSON array of rows for the presentation layer.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.rows)
    }
}
