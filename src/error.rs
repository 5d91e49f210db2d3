// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

use crate::ingest::Encoding;

/// Every way the consolidation engine can fail.
///
/// Only [`Error::Consolidation`] is fatal to a run; the rest are recovered
/// where they happen and surface as counters in [`crate::diagnostics`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot extract archive {archive}: {source}")]
    Extraction {
        archive: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("no handler for format `{format}` ({name})")]
    Format { name: String, format: String },

    #[error("{name} could not be decoded as any of {tried:?}")]
    Encoding { name: String, tried: Vec<Encoding> },

    #[error("nothing to consolidate: {0}")]
    Consolidation(String),

    #[error("alias `{alias}` maps to both `{first}` and `{second}`")]
    AliasConflict {
        alias: String,
        first: String,
        second: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Workbook(#[from] calamine::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
