use std::path::PathBuf;
use std::time::Instant;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::Dataset;
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::processing::{
    read_bronze, write_silver, DefaultQualityGate, QualityGate, QualityGateConfig,
    SilverNormalizer, TransformStats, Transformer, ValidationReport, WriteSummary,
};
use crate::pipeline::storage::StorageLayout;

/// Everything a successful bronze -> silver run produced
#[derive(Debug, Clone)]
pub struct SilverRun {
    pub run_id: Uuid,
    pub bronze_partitions: usize,
    pub bronze_files: usize,
    pub rows_read: usize,
    pub transform: TransformStats,
    pub report: ValidationReport,
    pub written: WriteSummary,
    /// The cleaned dataset, including the `ano_mes` column
    pub dataset: Dataset,
}

/// Runs read -> transform -> validate -> write over the bronze and silver roots
pub struct SilverPipeline {
    bronze_root: PathBuf,
    silver_root: PathBuf,
    normalizer: Box<dyn Transformer + Send + Sync>,
    quality_gate: Box<dyn QualityGate + Send + Sync>,
}

impl SilverPipeline {
    pub fn new(layout: &StorageLayout, gate_config: QualityGateConfig) -> Self {
        Self::with_stages(
            layout,
            Box::new(SilverNormalizer::new()),
            Box::new(DefaultQualityGate::with_config(gate_config)),
        )
    }

    pub fn with_stages(
        layout: &StorageLayout,
        normalizer: Box<dyn Transformer + Send + Sync>,
        quality_gate: Box<dyn QualityGate + Send + Sync>,
    ) -> Self {
        Self {
            bronze_root: layout.bronze_dir(),
            silver_root: layout.silver_dir(),
            normalizer,
            quality_gate,
        }
    }

    /// Execute one full run. Quality alerts never stop the write; any read or write
    /// failure aborts the run.
    pub fn run(&self) -> Result<SilverRun> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        metrics::silver::run_started();
        info!(%run_id, bronze = %self.bronze_root.display(), "Starting silver run");

        let result = self.execute(run_id);
        metrics::silver::run_duration(started.elapsed().as_secs_f64());

        match &result {
            Ok(run) => info!(
                %run_id,
                rows = run.dataset.len(),
                partitions = run.written.partition_count(),
                status = %run.report.status,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Silver run finished"
            ),
            Err(e) => {
                metrics::silver::run_failed();
                error!(%run_id, error = %e, "Silver run failed");
            }
        }
        result
    }

    fn execute(&self, run_id: Uuid) -> Result<SilverRun> {
        let load = read_bronze(&self.bronze_root)?;
        let rows_read = load.dataset.len();
        metrics::silver::rows_read(rows_read);
        info!(
            %run_id,
            rows = rows_read,
            partitions = load.partitions,
            files = load.files,
            "Loaded bronze layer"
        );

        let outcome = self.normalizer.transform(load.dataset);
        let stats = outcome.stats;
        metrics::silver::duplicates_removed(stats.duplicates_removed);
        metrics::silver::invalid_rows_removed(stats.non_positive_removed);
        for (column, count) in &stats.coerced_to_null {
            metrics::silver::values_coerced_to_null(column, *count);
            warn!(%run_id, column = %column, count, "Unparseable values set to null");
        }
        info!(
            %run_id,
            rows_in = stats.rows_in,
            rows_out = stats.rows_out,
            duplicates = stats.duplicates_removed,
            non_positive = stats.non_positive_removed,
            "Transformation complete"
        );

        let report = self.quality_gate.validate(&outcome.dataset);
        for alert in &report.alerts {
            metrics::silver::quality_alert(&alert.column);
            warn!(
                %run_id,
                column = %alert.column,
                nulls = alert.nulls,
                percent = alert.percent,
                "Null rate above threshold"
            );
        }
        for (label, count) in report.invalid_values.nonzero() {
            warn!(%run_id, check = label, count, "Invalid values found");
        }
        info!(%run_id, total = report.total_records, status = %report.status, "Validation complete");

        let written = write_silver(&self.silver_root, &outcome.dataset)?;
        metrics::silver::partitions_written(written.partition_count());
        metrics::silver::rows_written(outcome.dataset.len());
        match &written.unpartitioned {
            Some(path) => info!(%run_id, path = %path.display(), "Wrote unpartitioned silver file"),
            None => info!(
                %run_id,
                partitions = written.partition_count(),
                root = %self.silver_root.display(),
                "Wrote silver partitions"
            ),
        }

        Ok(SilverRun {
            run_id,
            bronze_partitions: load.partitions,
            bronze_files: load.files,
            rows_read,
            transform: stats,
            report,
            written,
            dataset: outcome.dataset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Value;
    use crate::error::PipelineError;
    use crate::pipeline::processing::QualityStatus;
    use crate::pipeline::storage::{columnar, partition_dir};
    use tempfile::tempdir;

    fn bronze(layout: &StorageLayout, key: &str, rows: Vec<Vec<Value>>) {
        let ds = Dataset::from_rows(
            vec!["valor".into(), "ano".into(), "mes".into(), "orgao".into()],
            rows,
        )
        .unwrap();
        let path = partition_dir(&layout.bronze_dir(), key).join(format!("dados_{key}.parquet"));
        columnar::write_parquet_file(&path, &ds).unwrap();
    }

    #[test]
    fn test_run_writes_partitions() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        bronze(
            &layout,
            "2023_01",
            vec![
                vec![Value::Float(1.0), Value::Int(2023), Value::Int(1), Value::text("a")],
                vec![Value::Float(1.0), Value::Int(2023), Value::Int(1), Value::text("a")],
                vec![Value::Float(0.0), Value::Int(2023), Value::Int(1), Value::text("b")],
            ],
        );
        bronze(
            &layout,
            "2023_02",
            vec![vec![Value::Float(2.0), Value::Int(2023), Value::Int(2), Value::text("c")]],
        );

        let run = SilverPipeline::new(&layout, QualityGateConfig::default()).run().unwrap();
        assert_eq!(run.rows_read, 4);
        assert_eq!(run.bronze_partitions, 2);
        assert_eq!(run.transform.duplicates_removed, 1);
        assert_eq!(run.transform.non_positive_removed, 1);
        assert_eq!(run.report.total_records, 2);
        assert_eq!(run.report.status, QualityStatus::Ok);
        assert_eq!(run.written.partition_count(), 2);
        assert!(layout.silver_dir().join("ano_mes=2023_02").join("dados_silver.parquet").is_file());
    }

    #[test]
    fn test_alert_does_not_block_write() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        bronze(
            &layout,
            "2023_01",
            vec![
                vec![Value::Float(1.0), Value::Int(2023), Value::Int(1), Value::Null],
                vec![Value::Float(2.0), Value::Int(2023), Value::Int(1), Value::text("x")],
            ],
        );

        let run = SilverPipeline::new(&layout, QualityGateConfig::default()).run().unwrap();
        assert_eq!(run.report.status, QualityStatus::Alerta);
        assert!(layout.silver_dir().join("ano_mes=2023_01").join("dados_silver.parquet").is_file());
    }

    #[test]
    fn test_missing_bronze_fails_without_writing() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        let err = SilverPipeline::new(&layout, QualityGateConfig::default()).run().unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
        assert!(!layout.silver_dir().exists());
    }
}
