use std::path::{Path, PathBuf};

use crate::constants;
use crate::domain::{columns, Dataset};
use crate::error::Result;
use crate::pipeline::storage::{columnar, partition_dir};

/// One partition file produced by [`write_silver`]
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionWrite {
    pub key: String,
    pub rows: usize,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteSummary {
    pub partitions: Vec<PartitionWrite>,
    /// Set when the dataset had no `ano_mes` column and was written as a single file
    pub unpartitioned: Option<PathBuf>,
}

impl WriteSummary {
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn rows_written(&self) -> usize {
        self.partitions.iter().map(|p| p.rows).sum()
    }
}

/// Persist the silver dataset under `root`.
///
/// With an `ano_mes` column, rows are grouped by key into
/// `ano_mes=<key>/dados_silver.parquet` and the key column is kept out of the files.
/// Rows with a null key land in the default partition. Without the column the whole
/// dataset goes to `root/dados_silver.parquet`. Existing files are replaced. Column types
/// are inferred once over the whole dataset so all partition files share a schema.
pub fn write_silver(root: &Path, dataset: &Dataset) -> Result<WriteSummary> {
    let Some(groups) = dataset.split_by(columns::ANO_MES) else {
        let path = root.join(constants::SILVER_FILE_NAME);
        columnar::write_parquet_file(&path, dataset)?;
        return Ok(WriteSummary {
            partitions: Vec::new(),
            unpartitioned: Some(path),
        });
    };

    // One schema for every partition file, inferred over the whole dataset
    let mut kinds = columnar::column_kinds(dataset);
    if let Some(idx) = dataset.column_index(columns::ANO_MES) {
        kinds.remove(idx);
    }

    let mut summary = WriteSummary::default();
    for (key, mut group) in groups {
        let key = key.unwrap_or_else(|| constants::NULL_PARTITION_KEY.to_string());
        group.drop_column(columns::ANO_MES);

        let path = partition_dir(root, &key).join(constants::SILVER_FILE_NAME);
        columnar::write_parquet_file_with_kinds(&path, &group, &kinds)?;
        summary.partitions.push(PartitionWrite {
            key,
            rows: group.len(),
            path,
        });
    }
    Ok(summary)
}
