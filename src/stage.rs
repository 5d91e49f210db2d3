// src/stage.rs
//! Turns what the downloader handed over into files ready for ingestion.
//!
//! Everything is staged before the first file is ingested, so extraction of
//! an archive always completes before any of its contents are read.

use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::archive::{format_of, ArchiveSource, Extractor, FileDescriptor};
use crate::diagnostics::{Diagnostics, SkipReason};
use crate::error::{Error, Result};

/// Formats the ingestor can read once staged.
const LOOSE_FORMATS: &[&str] = &["csv", "xlsx", "xls"];

#[derive(Debug, Clone)]
pub enum Payload {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// One completed download, or one local input.
#[derive(Debug, Clone)]
pub struct Resource {
    pub name: String,
    /// Lower-cased format, e.g. `zip` or `csv`.
    pub format: String,
    pub payload: Payload,
}

impl Resource {
    pub fn from_bytes(name: impl Into<String>, format: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            format: format.to_ascii_lowercase(),
            payload: Payload::Bytes(bytes),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            format: format_of(&path),
            payload: Payload::Path(path),
        }
    }

    /// File name to stage under: the resource name with path separators
    /// flattened and the format appended unless already present.
    fn file_name(&self) -> String {
        let flat = self.name.replace(['/', '\\'], "_");
        let suffix = format!(".{}", self.format);
        if flat.to_ascii_lowercase().ends_with(&suffix) {
            flat
        } else {
            flat + &suffix
        }
    }

    fn bytes(&self) -> Result<Vec<u8>> {
        match &self.payload {
            Payload::Bytes(b) => Ok(b.clone()),
            Payload::Path(p) => fs::read(p).map_err(|e| Error::io(p, e)),
        }
    }

    fn into_archive_source(self) -> ArchiveSource {
        match self.payload {
            Payload::Bytes(bytes) => ArchiveSource::Bytes {
                name: self.name,
                bytes,
            },
            Payload::Path(path) => ArchiveSource::Path(path),
        }
    }
}

/// Stage `resources` into `out_dir`, in order, and return every file ready
/// for ingestion.
///
/// Archives are extracted recursively; spreadsheets and CSVs are written
/// alongside. A resource that cannot be read, unpacked or written, or whose
/// format has no reader, is counted in `diag` and skipped. Only failing to
/// create `out_dir` itself is fatal.
pub fn stage(
    resources: Vec<Resource>,
    out_dir: &Path,
    diag: &Diagnostics,
) -> Result<Vec<FileDescriptor>> {
    let mut extractor = Extractor::new(out_dir, diag)?;
    let mut staged = Vec::new();

    for res in resources {
        debug!(resource = %res.name, format = %res.format, "staging");
        match res.format.as_str() {
            "zip" => {
                let name = res.name.clone();
                match extractor.extract(res.into_archive_source()) {
                    Ok(files) => staged.extend(files),
                    Err(e @ Error::Extraction { .. }) => {
                        diag.file_skipped(&name, SkipReason::Extraction, e)
                    }
                    Err(e) => diag.file_skipped(&name, SkipReason::Unreadable, e),
                }
            }
            f if LOOSE_FORMATS.contains(&f) => {
                let placed = res
                    .bytes()
                    .and_then(|bytes| extractor.place(Path::new(&res.file_name()), &bytes));
                match placed {
                    Ok(desc) => staged.push(desc),
                    Err(e) => diag.file_skipped(&res.name, SkipReason::Unreadable, e),
                }
            }
            other => {
                let err = Error::Format {
                    name: res.name.clone(),
                    format: other.to_string(),
                };
                diag.file_skipped(&res.name, SkipReason::Format, err);
            }
        }
    }

    info!(files = staged.len(), dir = %out_dir.display(), "staging complete");
    Ok(staged)
}
