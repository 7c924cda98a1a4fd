//! End-to-end tests: raw log lines in, aggregate table out.

use std::io::Write;

use chrono::{TimeZone, Utc};
use latency_aggregator::bucket::BucketGranularity;
use latency_aggregator::metrics::LossThresholds;
use latency_aggregator::{LatencyPipeline, PassStatus, PipelineConfig, PipelineError};
use tempfile::NamedTempFile;
use tick_types::rank::PercentileRank;

fn micros(h: u32, m: u32, s: u32) -> i64 {
    Utc.with_ymd_and_hms(2024, 3, 14, h, m, s)
        .unwrap()
        .timestamp_micros()
}

fn line(source: &str, event_ts: i64, tick_ts: i64) -> String {
    format!("tickSource:{source},EVENT_TIME:evt:{event_ts},tick_stamp:vendor:{tick_ts}")
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn test_bloomberg_fx_single_bucket() {
    init_tracing();
    let t = micros(9, 30, 0);
    let lines = vec![
        line("bloomberg_fx", t + 100_000 + 10_000, t + 100_000),
        line("bloomberg_fx", t + 300_000, t + 300_000 + 20_000),
        line("bloomberg_fx", t + 700_000 + 30_000, t + 700_000),
    ];

    let report = LatencyPipeline::with_defaults().run_lines(&lines);
    assert_eq!(report.status, PassStatus::Completed);
    assert_eq!(report.table.len(), 1);

    let row = &report.table.rows()[0];
    assert_eq!(row.source_display_name, "Bloomberg fx");
    assert_eq!(row.max_latency_ms, 30.0);
    assert_eq!(row.percentile(PercentileRank::MEDIAN), Some(20.0));
    assert_eq!(row.bucket_start_micros, t);
    assert_eq!(row.bucket_start().unwrap(), Utc.with_ymd_and_hms(2024, 3, 14, 9, 30, 0).unwrap());
}

#[test]
fn test_heartbeat_only_bucket_emits_no_row() {
    let t = micros(9, 30, 0);
    let config = PipelineConfig::default().with_heartbeat_sources(["reuters_heartbeat"]);
    let lines = vec![
        line("reuters_heartbeat", t + 1_000, t),
        line("reuters_heartbeat", t + 2_000, t),
        // A real source in a different second
        line("reuters_fx", t + 1_000_000 + 5_000, t + 1_000_000),
    ];

    let report = LatencyPipeline::new(config).unwrap().run_lines(&lines);
    assert_eq!(report.table.len(), 1);
    assert!(report.table.rows_for_source("reuters_heartbeat").is_empty());
    assert!(report.table.rows_in_range(t, t + 1_000_000).is_empty());
    assert_eq!(report.stats.dropped_heartbeat, 2);
}

#[test]
fn test_sentinel_events_excluded_from_all_output() {
    let t = micros(9, 30, 0);
    let sentinel = Utc.with_ymd_and_hms(1970, 7, 4, 12, 0, 0).unwrap().timestamp_micros();
    let lines = vec![
        line("bloomberg_fx", sentinel, t),
        line("bloomberg_fx", 0, 0),
        line("bloomberg_fx", t + 5_000, t),
    ];

    let report = LatencyPipeline::with_defaults().run_lines(&lines);
    assert_eq!(report.stats.dropped_sentinel, 2);
    assert_eq!(report.table.len(), 1);
    let row = &report.table.rows()[0];
    assert_eq!(row.sample_count, 1);
    assert_eq!(row.max_latency_ms, 5.0);
}

#[test]
fn test_outlier_boundary() {
    let t = micros(9, 30, 0);
    let lines = vec![
        line("ice_rates", t + 1_500_000, t),
        line("ice_rates", t + 1_500_001, t + 1),
        line("ice_rates", t + 1_500_002, t + 1),
    ];

    let report = LatencyPipeline::with_defaults().run_lines(&lines);
    assert_eq!(report.stats.dropped_outlier, 1);

    // Both samples at exactly 1500 ms are kept, one microsecond above is not
    let rows = report.table.rows_for_source("ice_rates");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].sample_count, 2);
    assert_eq!(rows[0].max_latency_ms, 1500.0);
}

#[test]
fn test_single_sample_bucket_all_percentiles_equal() {
    let t = micros(9, 30, 0);
    let config = PipelineConfig::default()
        .with_percentile_ranks((0..=100).map(|r| PercentileRank::new(r).unwrap()));
    let report = LatencyPipeline::new(config)
        .unwrap()
        .run_lines(vec![line("cme_futures", t + 42_000, t)]);

    let row = &report.table.rows()[0];
    assert_eq!(row.max_latency_ms, 42.0);
    assert_eq!(row.percentiles.len(), 101);
    assert!(row.percentiles.values().all(|v| *v == 42.0));
}

#[test]
fn test_minute_buckets_and_table_order() {
    let t = micros(9, 30, 0);
    let config = PipelineConfig::default().with_granularity(BucketGranularity::Minute);
    let lines = vec![
        line("tick_source_b", t + 61_000_000, t + 61_000_000 - 4_000),
        line("tick_source_a", t + 59_000_000, t + 59_000_000 - 2_000),
        line("tick_source_b", t + 1_000_000, t + 1_000_000 - 3_000),
        line("tick_source_a", t + 62_000_000, t + 62_000_000 - 1_000),
    ];

    let report = LatencyPipeline::new(config).unwrap().run_lines(&lines);
    let keys: Vec<(i64, &str)> = report
        .table
        .rows()
        .iter()
        .map(|r| (r.bucket_start_micros, r.source_display_name.as_str()))
        .collect();

    assert_eq!(
        keys,
        vec![
            (t, "Tick source a"),
            (t, "Tick source b"),
            (t + 60_000_000, "Tick source a"),
            (t + 60_000_000, "Tick source b"),
        ]
    );
    assert_eq!(report.table.rows_in_range(t + 60_000_000, i64::MAX).len(), 2);
}

#[test]
fn test_log_file_pass() {
    init_tracing();
    let t = micros(9, 30, 0);
    let mut file = NamedTempFile::new().unwrap();
    for k in 0..10i64 {
        writeln!(file, "{}", line("bloomberg_fx", t + k * 10_000 + 7_000, t + k * 10_000)).unwrap();
    }
    writeln!(file).unwrap();
    writeln!(file, "garbage without tags").unwrap();
    file.flush().unwrap();

    let config = PipelineConfig::default().with_log_path(file.path());
    let report = LatencyPipeline::new(config).unwrap().run_log_file().unwrap();

    assert_eq!(report.stats.records_seen, 11);
    assert_eq!(report.stats.events_accepted, 10);
    assert_eq!(report.stats.dropped_incomplete, 1);
    assert_eq!(report.table.len(), 1);
    assert_eq!(report.table.rows()[0].max_latency_ms, 7.0);

    let alerts = report.stats.check_thresholds(&LossThresholds {
        max_loss_ratio: 0.05,
        max_tokens_rejected: 10,
    });
    assert!(alerts.iter().any(|a| a.metric == "loss_ratio"));
}

#[test]
fn test_missing_log_file_is_fatal() {
    let config = PipelineConfig::default().with_log_path("/nonexistent/dir/ticks.log");
    let result = LatencyPipeline::new(config).unwrap().run_log_file();
    assert!(matches!(result, Err(PipelineError::Io(_))));
}

#[test]
fn test_table_json_export() {
    let t = micros(9, 30, 0);
    let report = LatencyPipeline::with_defaults().run_lines(vec![line("tick_source_a", t + 3_000, t)]);

    let json = report.table.to_json().unwrap();
    assert!(json.contains("\"source_display_name\":\"Tick source a\""));
    assert!(json.contains("\"max_latency_ms\":3.0"));
}
