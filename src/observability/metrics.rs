//! Metric recording functions organized by phase.
//!
//! No recorder is installed by default, in which case every call is a no-op.

/// Metric names used across the pipeline
#[derive(Debug, Clone, Copy)]
pub enum MetricName {
    SilverRuns,
    SilverRunFailures,
    SilverRowsRead,
    SilverRowsWritten,
    SilverDuplicatesRemoved,
    SilverInvalidRowsRemoved,
    SilverValuesCoercedToNull,
    SilverPartitionsWritten,
    SilverQualityAlerts,
    SilverRunDuration,
    IngestPagesFetched,
    IngestPageFailures,
    IngestRecordsFetched,
    IngestRowsSkipped,
    IngestPageDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::SilverRuns => "gastos_silver_runs_total",
            MetricName::SilverRunFailures => "gastos_silver_run_failures_total",
            MetricName::SilverRowsRead => "gastos_silver_rows_read_total",
            MetricName::SilverRowsWritten => "gastos_silver_rows_written_total",
            MetricName::SilverDuplicatesRemoved => "gastos_silver_duplicates_removed_total",
            MetricName::SilverInvalidRowsRemoved => "gastos_silver_invalid_rows_removed_total",
            MetricName::SilverValuesCoercedToNull => "gastos_silver_values_coerced_to_null_total",
            MetricName::SilverPartitionsWritten => "gastos_silver_partitions_written_total",
            MetricName::SilverQualityAlerts => "gastos_silver_quality_alerts_total",
            MetricName::SilverRunDuration => "gastos_silver_run_duration_seconds",
            MetricName::IngestPagesFetched => "gastos_ingest_pages_fetched_total",
            MetricName::IngestPageFailures => "gastos_ingest_page_failures_total",
            MetricName::IngestRecordsFetched => "gastos_ingest_records_fetched_total",
            MetricName::IngestRowsSkipped => "gastos_ingest_rows_skipped_total",
            MetricName::IngestPageDuration => "gastos_ingest_page_duration_seconds",
        }
    }
}

pub mod silver {
    use super::MetricName;

    pub fn run_started() {
        ::metrics::counter!(MetricName::SilverRuns.as_str()).increment(1);
    }

    pub fn run_failed() {
        ::metrics::counter!(MetricName::SilverRunFailures.as_str()).increment(1);
    }

    pub fn rows_read(count: usize) {
        ::metrics::counter!(MetricName::SilverRowsRead.as_str()).increment(count as u64);
    }

    pub fn rows_written(count: usize) {
        ::metrics::counter!(MetricName::SilverRowsWritten.as_str()).increment(count as u64);
    }

    pub fn duplicates_removed(count: usize) {
        ::metrics::counter!(MetricName::SilverDuplicatesRemoved.as_str()).increment(count as u64);
    }

    pub fn invalid_rows_removed(count: usize) {
        ::metrics::counter!(MetricName::SilverInvalidRowsRemoved.as_str()).increment(count as u64);
    }

    pub fn values_coerced_to_null(column: &str, count: usize) {
        ::metrics::counter!(
            MetricName::SilverValuesCoercedToNull.as_str(),
            "column" => column.to_string()
        )
        .increment(count as u64);
    }

    pub fn partitions_written(count: usize) {
        ::metrics::counter!(MetricName::SilverPartitionsWritten.as_str()).increment(count as u64);
    }

    pub fn quality_alert(column: &str) {
        ::metrics::counter!(
            MetricName::SilverQualityAlerts.as_str(),
            "column" => column.to_string()
        )
        .increment(1);
    }

    pub fn run_duration(secs: f64) {
        ::metrics::histogram!(MetricName::SilverRunDuration.as_str()).record(secs);
    }
}

pub mod ingest {
    use super::MetricName;

    pub fn page_fetched(records: usize) {
        ::metrics::counter!(MetricName::IngestPagesFetched.as_str()).increment(1);
        ::metrics::counter!(MetricName::IngestRecordsFetched.as_str()).increment(records as u64);
    }

    pub fn page_failed() {
        ::metrics::counter!(MetricName::IngestPageFailures.as_str()).increment(1);
    }

    pub fn rows_skipped(count: usize) {
        ::metrics::counter!(MetricName::IngestRowsSkipped.as_str()).increment(count as u64);
    }

    pub fn page_duration(secs: f64) {
        ::metrics::histogram!(MetricName::IngestPageDuration.as_str()).record(secs);
    }
}
