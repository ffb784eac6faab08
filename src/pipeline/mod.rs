// Data pipeline: ingestion into bronze, bronze -> silver processing, and storage

pub mod ingestion;
pub mod orchestrator;
pub mod processing;
pub mod storage;

pub use orchestrator::{SilverPipeline, SilverRun};
