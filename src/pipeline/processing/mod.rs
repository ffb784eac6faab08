// Bronze -> silver processing: reading, normalization, validation, and writing

pub mod normalize;
pub mod quality_gate;
pub mod reader;
pub mod silver_writer;

pub use normalize::{SilverNormalizer, TransformOutcome, TransformStats, Transformer};
pub use quality_gate::{DefaultQualityGate, QualityGate, QualityGateConfig, QualityStatus, ValidationReport};
pub use reader::{read_bronze, BronzeLoad};
pub use silver_writer::{write_silver, PartitionWrite, WriteSummary};
