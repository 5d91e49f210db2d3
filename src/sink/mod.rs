// src/sink/mod.rs
//! Where the master table goes once a run succeeds.

mod parquet;

pub use self::parquet::ParquetSink;

use serde::{Deserialize, Serialize};

use crate::consolidate::MasterTable;
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Whatever the sink held for this table is replaced.
    #[default]
    Replace,
    /// Rows are added after what the sink already holds.
    Append,
}

/// Durable storage for a finished [`MasterTable`]. Columns must be stored
/// in canonical schema order.
pub trait Sink {
    fn write(&mut self, table: &MasterTable, mode: WriteMode) -> Result<()>;
}
