// Storage layout of the raw / bronze / silver layers and columnar file I/O

pub mod columnar;

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::Result;

/// Directory layout under the data root
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join(constants::RAW_DIR)
    }

    pub fn bronze_dir(&self) -> PathBuf {
        self.root.join(constants::BRONZE_DIR)
    }

    pub fn silver_dir(&self) -> PathBuf {
        self.root.join(constants::SILVER_DIR)
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.raw_dir().join(constants::CHECKPOINT_FILE)
    }
}

/// One `ano_mes=<key>` directory of a layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDir {
    pub key: String,
    pub path: PathBuf,
}

impl PartitionDir {
    /// Parquet files inside the partition, sorted by name
    pub fn parquet_files(&self) -> Result<Vec<PathBuf>> {
        parquet_files_in(&self.path)
    }
}

pub fn partition_dir(layer_root: &Path, key: &str) -> PathBuf {
    layer_root.join(format!("{}{}", constants::PARTITION_PREFIX, key))
}

/// Partition directories directly under `layer_root`, in lexicographic order.
/// A missing root yields an empty list.
pub fn list_partitions(layer_root: &Path) -> Result<Vec<PartitionDir>> {
    if !layer_root.is_dir() {
        return Ok(Vec::new());
    }
    let mut partitions = Vec::new();
    for entry in fs::read_dir(layer_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(key) = name.to_str().and_then(|n| n.strip_prefix(constants::PARTITION_PREFIX)) else {
            continue;
        };
        partitions.push(PartitionDir {
            key: key.to_string(),
            path: entry.path(),
        });
    }
    partitions.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(partitions)
}

/// `.parquet` files directly inside `dir`, sorted by name
pub fn parquet_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_parquet_extension(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn has_parquet_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(constants::PARQUET_EXTENSION))
}
