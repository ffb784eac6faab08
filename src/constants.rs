/// Storage naming shared by the ingestion and silver stages.
/// Directory prefix used for every partition in the bronze and silver layers.
pub const PARTITION_PREFIX: &str = "ano_mes=";

/// Partition name for rows whose `ano_mes` could not be derived
pub const NULL_PARTITION_KEY: &str = "__HIVE_DEFAULT_PARTITION__";

pub const PARQUET_EXTENSION: &str = "parquet";
pub const SILVER_FILE_NAME: &str = "dados_silver.parquet";

pub const RAW_DIR: &str = "raw";
pub const BRONZE_DIR: &str = "bronze";
pub const SILVER_DIR: &str = "silver";
pub const CHECKPOINT_FILE: &str = "checkpoint.txt";

// Raw archives: gastos_diretos_page_<N>.json.gz
pub const RAW_ARCHIVE_PREFIX: &str = "gastos_diretos_page_";
pub const RAW_ARCHIVE_SUFFIX: &str = ".json.gz";

/// Remote dataset endpoint
pub const DEFAULT_API_URL: &str = "https://brasil.io/api/v1/dataset/gastos-diretos/gastos/data";
pub const DEFAULT_API_KEY_ENV: &str = "API_KEY";
pub const DATA_ROOT_ENV: &str = "GASTOS_DATA_ROOT";

// Quality gate defaults. Overridable through the [quality] section of config.toml.
pub const NULL_ALERT_THRESHOLD: f64 = 0.05;
pub const MIN_VALID_YEAR: i64 = 2000;
pub const MAX_VALID_YEAR: i64 = 2025;
pub const MIN_VALID_MONTH: i64 = 1;
pub const MAX_VALID_MONTH: i64 = 12;

/// File name for a bronze partition, e.g. `dados_2023_01.parquet`
pub fn bronze_file_name(key: &str) -> String {
    format!("dados_{key}.{PARQUET_EXTENSION}")
}

/// File name for a raw page archive
pub fn raw_archive_name(page: u32) -> String {
    format!("{RAW_ARCHIVE_PREFIX}{page}{RAW_ARCHIVE_SUFFIX}")
}

/// Page number encoded in a raw archive file name, if it follows the naming convention
pub fn raw_archive_page(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix(RAW_ARCHIVE_PREFIX)?
        .strip_suffix(RAW_ARCHIVE_SUFFIX)?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_archive_name_round_trips_page() {
        let name = raw_archive_name(42);
        assert_eq!(name, "gastos_diretos_page_42.json.gz");
        assert_eq!(raw_archive_page(&name), Some(42));
    }

    #[test]
    fn test_raw_archive_page_rejects_foreign_files() {
        assert_eq!(raw_archive_page("checkpoint.txt"), None);
        assert_eq!(raw_archive_page("gastos_diretos_page_x.json.gz"), None);
        assert_eq!(raw_archive_page("gastos_diretos_page_3.json"), None);
    }
}
