use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value as JsonValue;

use crate::constants;
use crate::error::{PipelineError, Result};

/// One `gastos_diretos_page_<N>.json.gz` file in the raw layer
#[derive(Debug)]
pub struct RawArchive {
    pub name: String,
    pub page: u32,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Number of entries in `results`, or why the archive could not be read
    pub records: std::result::Result<usize, String>,
}

/// Gzip-compress one API page as JSON into `raw_dir`
pub fn write_page(raw_dir: &Path, page: u32, body: &JsonValue) -> Result<PathBuf> {
    fs::create_dir_all(raw_dir)?;
    let path = raw_dir.join(constants::raw_archive_name(page));
    let file = File::create(&path)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut encoder, body)?;
    encoder.finish()?.flush()?;
    Ok(path)
}

pub fn read_page(path: &Path) -> Result<JsonValue> {
    let file = File::open(path)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    Ok(serde_json::from_reader(decoder)?)
}

fn count_records(path: &Path) -> std::result::Result<usize, String> {
    let body = read_page(path).map_err(|e| e.to_string())?;
    body.get("results")
        .and_then(JsonValue::as_array)
        .map(Vec::len)
        .ok_or_else(|| "archive has no 'results' array".to_string())
}

fn archive_paths(raw_dir: &Path) -> Result<Vec<(u32, String, PathBuf)>> {
    let entries = match fs::read_dir(raw_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PipelineError::Io(e)),
    };

    let mut archives = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(page) = constants::raw_archive_page(&name) {
            if entry.file_type()?.is_file() {
                archives.push((page, name, entry.path()));
            }
        }
    }
    archives.sort_by_key(|(page, _, _)| *page);
    Ok(archives)
}

/// Raw archives sorted by page number. Unreadable archives are reported, not fatal.
pub fn list_archives(raw_dir: &Path) -> Result<Vec<RawArchive>> {
    archive_paths(raw_dir)?
        .into_iter()
        .map(|(page, name, path)| {
            let size_bytes = fs::metadata(&path)?.len();
            let records = count_records(&path);
            Ok(RawArchive {
                name,
                page,
                path,
                size_bytes,
                records,
            })
        })
        .collect()
}

/// Delete every raw archive, leaving other files (such as the checkpoint) alone.
/// Returns the number of files removed.
pub fn clean_archives(raw_dir: &Path) -> Result<usize> {
    let archives = archive_paths(raw_dir)?;
    for (_, _, path) in &archives {
        fs::remove_file(path)?;
    }
    Ok(archives.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_write_and_read_page() {
        let dir = tempdir().unwrap();
        let body = json!({"count": 2, "results": [{"valor": 1}, {"valor": 2}]});
        let path = write_page(dir.path(), 3, &body).unwrap();

        assert_eq!(path.file_name().unwrap(), "gastos_diretos_page_3.json.gz");
        assert_eq!(read_page(&path).unwrap(), body);
    }

    #[test]
    fn test_list_sorts_by_page_and_reports_bad_files() {
        let dir = tempdir().unwrap();
        write_page(dir.path(), 10, &json!({"results": [{}]})).unwrap();
        write_page(dir.path(), 2, &json!({"results": [{}, {}]})).unwrap();
        fs::write(dir.path().join("gastos_diretos_page_5.json.gz"), b"not gzip").unwrap();
        fs::write(dir.path().join("checkpoint.txt"), "3").unwrap();

        let archives = list_archives(dir.path()).unwrap();
        let pages: Vec<_> = archives.iter().map(|a| a.page).collect();
        assert_eq!(pages, vec![2, 5, 10]);
        assert_eq!(archives[0].records, Ok(2));
        assert!(archives[1].records.is_err());
        assert_eq!(archives[2].records, Ok(1));
        assert!(archives[0].size_bytes > 0);
    }

    #[test]
    fn test_clean_keeps_other_files() {
        let dir = tempdir().unwrap();
        write_page(dir.path(), 1, &json!({"results": []})).unwrap();
        write_page(dir.path(), 2, &json!({"results": []})).unwrap();
        fs::write(dir.path().join("checkpoint.txt"), "3").unwrap();

        assert_eq!(clean_archives(dir.path()).unwrap(), 2);
        assert!(list_archives(dir.path()).unwrap().is_empty());
        assert!(dir.path().join("checkpoint.txt").exists());
    }

    #[test]
    fn test_missing_dir_lists_nothing() {
        let dir = tempdir().unwrap();
        assert!(list_archives(&dir.path().join("raw")).unwrap().is_empty());
        assert_eq!(clean_archives(&dir.path().join("raw")).unwrap(), 0);
    }
}
