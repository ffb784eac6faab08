use std::path::{Path, PathBuf};

use tracing::info;

use crate::constants;
use crate::domain::{columns, Dataset};
use crate::error::{PipelineError, Result};
use crate::pipeline::ingestion::{raw_archive, RawArchive};
use crate::pipeline::storage::{self, columnar, StorageLayout};

#[derive(Debug)]
pub struct RawListing {
    pub archives: Vec<RawArchive>,
    pub total_records: usize,
    pub total_bytes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BronzePartitionInfo {
    pub key: String,
    pub files: usize,
    pub records: usize,
    /// Sum of numeric `valor` cells, when the column exists
    pub valor_total: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValorSummary {
    pub sum: f64,
    pub mean: f64,
    pub max: f64,
}

#[derive(Debug, Clone)]
pub struct SilverSummary {
    pub files: Vec<PathBuf>,
    pub total_records: usize,
    pub columns: Vec<String>,
    pub valor: Option<ValorSummary>,
    pub ano_range: Option<(i64, i64)>,
    /// First rows rendered as a table
    pub sample: String,
}

/// Read-side views over the raw, bronze and silver layers
pub struct CatalogUseCase {
    layout: StorageLayout,
}

impl CatalogUseCase {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    pub fn list_raw_archives(&self) -> Result<RawListing> {
        let archives = raw_archive::list_archives(&self.layout.raw_dir())?;
        let total_records = archives.iter().filter_map(|a| a.records.as_ref().ok()).sum();
        let total_bytes = archives.iter().map(|a| a.size_bytes).sum();
        Ok(RawListing {
            archives,
            total_records,
            total_bytes,
        })
    }

    /// Delete raw page archives. Returns how many were removed.
    pub fn clean_raw_archives(&self) -> Result<usize> {
        let removed = raw_archive::clean_archives(&self.layout.raw_dir())?;
        info!(removed, dir = %self.layout.raw_dir().display(), "Raw archives removed");
        Ok(removed)
    }

    pub fn list_bronze_partitions(&self) -> Result<Vec<BronzePartitionInfo>> {
        storage::list_partitions(&self.layout.bronze_dir())?
            .into_iter()
            .map(|partition| {
                let files = partition.parquet_files()?;
                let mut records = 0;
                let mut valor_total: Option<f64> = None;
                for file in &files {
                    let ds = columnar::read_parquet_file(file)?;
                    records += ds.len();
                    if let Some(sum) = valor_sum(&ds) {
                        *valor_total.get_or_insert(0.0) += sum;
                    }
                }
                Ok(BronzePartitionInfo {
                    key: partition.key,
                    files: files.len(),
                    records,
                    valor_total,
                })
            })
            .collect()
    }

    /// Load the current silver files and describe them. Fails with `NotFound` when the
    /// silver layer holds no files.
    pub fn summarize_silver(&self, sample_rows: usize) -> Result<SilverSummary> {
        let root = self.layout.silver_dir();
        let files = silver_files(&root)?;
        if files.is_empty() {
            return Err(PipelineError::NotFound(format!(
                "no silver data under '{}'; run the silver pipeline first",
                root.display()
            )));
        }

        let mut dataset = Dataset::default();
        for file in &files {
            dataset.concat(columnar::read_parquet_file(file)?);
        }

        let valor = numeric(&dataset, columns::VALOR).and_then(|values| {
            let max = values.iter().copied().reduce(f64::max)?;
            let sum: f64 = values.iter().sum();
            Some(ValorSummary {
                sum,
                mean: sum / values.len() as f64,
                max,
            })
        });
        let ano_range = numeric(&dataset, columns::ANO).and_then(|values| {
            let ints: Vec<i64> = values.iter().map(|v| *v as i64).collect();
            Some((*ints.iter().min()?, *ints.iter().max()?))
        });

        Ok(SilverSummary {
            total_records: dataset.len(),
            columns: dataset.columns().to_vec(),
            valor,
            ano_range,
            sample: columnar::pretty_format(&dataset.head(sample_rows))?,
            files,
        })
    }
}

/// Partition files when any partition exists, otherwise the single unpartitioned file.
/// A root file left by an earlier unpartitioned run is ignored once partitions exist.
fn silver_files(root: &Path) -> Result<Vec<PathBuf>> {
    let partitions = storage::list_partitions(root)?;
    if !partitions.is_empty() {
        let mut files = Vec::new();
        for partition in &partitions {
            files.extend(partition.parquet_files()?);
        }
        return Ok(files);
    }
    let single = root.join(constants::SILVER_FILE_NAME);
    Ok(if single.is_file() { vec![single] } else { Vec::new() })
}

fn numeric(dataset: &Dataset, column: &str) -> Option<Vec<f64>> {
    Some(dataset.column_values(column)?.filter_map(|v| v.as_f64()).collect())
}

fn valor_sum(dataset: &Dataset) -> Option<f64> {
    numeric(dataset, columns::VALOR).map(|values| values.iter().sum())
}
