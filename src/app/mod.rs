pub mod catalog_use_case;
pub mod ingest_use_case;
pub mod ports;

pub use catalog_use_case::CatalogUseCase;
pub use ingest_use_case::{IngestOptions, IngestSummary, IngestUseCase};
