pub mod config;
pub mod constants;
pub mod error;
pub mod pipeline;
pub mod render;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;

// Domain data shapes shared across layers
pub mod domain;

pub mod observability;

pub use error::{PipelineError, Result};
