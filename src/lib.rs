//! Consolidates bike-share ridership files published across many years and
//! formats into one validated table.

pub mod archive;
pub mod config;
pub mod consolidate;
pub mod diagnostics;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod pipeline;
pub mod schema;
pub mod sink;
pub mod stage;
pub mod validate;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use pipeline::Pipeline;
