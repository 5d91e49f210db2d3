// src/ingest/mod.rs
//! Reads one staged file into a [`RawTable`], keeping only allow-listed
//! columns.

mod delimited;
mod encoding;
mod raw_table;
mod workbook;

pub use delimited::read_delimited;
pub use encoding::Encoding;
pub use raw_table::RawTable;
pub use workbook::read_workbook;

use tracing::info;

use crate::archive::FileDescriptor;
use crate::config::SkipList;
use crate::diagnostics::{Diagnostics, SkipReason};
use crate::error::{Error, Result};

/// Decides, from a source header, whether a column is worth reading.
pub trait ColumnFilter: Send + Sync {
    fn allows(&self, column: &str) -> bool;
}

/// Per-run ingestion settings shared by every worker.
pub struct Ingestor<'a> {
    skip: &'a SkipList,
    encodings: &'a [Encoding],
    filter: &'a dyn ColumnFilter,
}

impl<'a> Ingestor<'a> {
    pub fn new(skip: &'a SkipList, encodings: &'a [Encoding], filter: &'a dyn ColumnFilter) -> Self {
        Self {
            skip,
            encodings,
            filter,
        }
    }

    /// Ingest `desc`, or record why it was skipped and return `None`.
    #[tracing::instrument(level = "debug", skip_all, fields(file = %desc.name))]
    pub fn ingest(&self, desc: &FileDescriptor, diag: &Diagnostics) -> Option<RawTable> {
        if self.skip.matches_name(&desc.name) {
            diag.file_skipped(&desc.name, SkipReason::KnownBad, "matched skip list");
            return None;
        }

        match self.read(desc) {
            Ok(table) => {
                diag.file_ingested(&desc.name, table.len());
                Some(table)
            }
            Err(e) => {
                let reason = match &e {
                    Error::Format { .. } => SkipReason::Format,
                    Error::Encoding { .. } => SkipReason::Encoding,
                    _ => SkipReason::Unreadable,
                };
                diag.file_skipped(&desc.name, reason, e);
                None
            }
        }
    }

    /// Dispatch on format without any skip-list or diagnostics handling.
    pub fn read(&self, desc: &FileDescriptor) -> Result<RawTable> {
        if desc.path.is_dir() {
            return Err(Error::Format {
                name: desc.name.clone(),
                format: "directory".into(),
            });
        }
        match desc.format.as_str() {
            "csv" => {
                let (table, enc) =
                    read_delimited(&desc.path, &desc.name, self.encodings, self.filter)?;
                info!(file = %desc.name, rows = table.len(), encoding = %enc, "read csv");
                Ok(table)
            }
            "xlsx" | "xls" => {
                let table = read_workbook(&desc.path, &desc.name, self.filter)?;
                info!(file = %desc.name, rows = table.len(), "read workbook");
                Ok(table)
            }
            other => Err(Error::Format {
                name: desc.name.clone(),
                format: other.to_string(),
            }),
        }
    }
}
