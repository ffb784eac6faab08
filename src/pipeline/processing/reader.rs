use std::path::Path;

use crate::domain::Dataset;
use crate::error::{PipelineError, Result};
use crate::pipeline::storage::{self, columnar};

/// Everything loaded from the bronze layer in one pass
#[derive(Debug, Clone)]
pub struct BronzeLoad {
    pub dataset: Dataset,
    pub partitions: usize,
    pub files: usize,
}

/// Load and concatenate every partition file under the bronze root.
///
/// Partitions are visited in lexicographic order and files inside a partition by name,
/// so the resulting row order is deterministic. Column sets are unioned; no cleaning
/// happens here.
pub fn read_bronze(root: &Path) -> Result<BronzeLoad> {
    if !root.is_dir() {
        return Err(PipelineError::NotFound(format!(
            "bronze directory '{}' does not exist; run ingestion first",
            root.display()
        )));
    }

    let partitions = storage::list_partitions(root)?;
    if partitions.is_empty() {
        return Err(PipelineError::NotFound(format!(
            "no partitions found under '{}'",
            root.display()
        )));
    }

    let mut dataset = Dataset::default();
    let mut files = 0;
    for partition in &partitions {
        for file in partition.parquet_files()? {
            dataset.concat(columnar::read_parquet_file(&file)?);
            files += 1;
        }
    }

    if files == 0 {
        return Err(PipelineError::NotFound(format!(
            "bronze partitions under '{}' contain no parquet files",
            root.display()
        )));
    }

    Ok(BronzeLoad {
        dataset,
        partitions: partitions.len(),
        files,
    })
}
