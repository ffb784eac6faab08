use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

/// Next page to fetch, persisted as a single integer in a text file
#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    pub const FIRST_PAGE: u32 = 1;

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved page, or `None` when no checkpoint exists. Garbage content is an error.
    pub fn load(&self) -> Result<Option<u32>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let trimmed = content.trim();
        match trimmed.parse::<u32>() {
            Ok(page) if page >= Self::FIRST_PAGE => Ok(Some(page)),
            _ => Err(PipelineError::Checkpoint(format!(
                "'{}' holds {:?}, expected a page number",
                self.path.display(),
                trimmed
            ))),
        }
    }

    /// Page to start from: the saved one or the first page
    pub fn start_page(&self) -> Result<u32> {
        Ok(self.load()?.unwrap_or(Self::FIRST_PAGE))
    }

    pub fn save(&self, next_page: u32) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, next_page.to_string())?;
        Ok(())
    }

    /// Remove the checkpoint. Returns whether a file was removed.
    pub fn clear(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_checkpoint_starts_at_first_page() {
        let dir = tempdir().unwrap();
        let checkpoint = Checkpoint::new(dir.path().join("raw").join("checkpoint.txt"));
        assert_eq!(checkpoint.load().unwrap(), None);
        assert_eq!(checkpoint.start_page().unwrap(), 1);
        assert!(!checkpoint.clear().unwrap());
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempdir().unwrap();
        let checkpoint = Checkpoint::new(dir.path().join("raw").join("checkpoint.txt"));
        checkpoint.save(7).unwrap();
        assert_eq!(checkpoint.start_page().unwrap(), 7);
        assert!(checkpoint.clear().unwrap());
        assert!(!checkpoint.path().exists());
    }

    #[test]
    fn test_garbage_checkpoint_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.txt");
        fs::write(&path, "page two").unwrap();
        let err = Checkpoint::new(&path).load().unwrap_err();
        assert!(matches!(err, PipelineError::Checkpoint(_)));
    }
}
