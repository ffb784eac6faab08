// Pipeline ingestion: raw page archives, checkpointing, and bronze partition appends

pub mod bronze_appender;
pub mod checkpoint;
pub mod raw_archive;

pub use bronze_appender::{append_page, AppendStats};
pub use checkpoint::Checkpoint;
pub use raw_archive::RawArchive;
