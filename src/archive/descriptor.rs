use serde::Serialize;
use std::path::{Path, PathBuf};

/// One item found inside a zip container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path relative to the archive root, already checked to stay inside it.
    pub path: PathBuf,
    pub is_directory: bool,
    /// `.zip` entries are unpacked in turn and never become descriptors.
    pub is_zip: bool,
}

impl ArchiveEntry {
    pub fn new(path: PathBuf, is_directory: bool) -> Self {
        let is_zip = !is_directory && format_of(&path) == "zip";
        Self {
            path,
            is_directory,
            is_zip,
        }
    }
}

/// A file ready for ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileDescriptor {
    /// Path relative to the staging directory, `/`-separated.
    pub name: String,
    /// Lower-cased suffix without the dot; empty when the file has none.
    pub format: String,
    pub path: PathBuf,
}

impl FileDescriptor {
    /// Describe `path`, naming it relative to `root` when it lives under it.
    pub fn from_path(path: impl Into<PathBuf>, root: &Path) -> Self {
        let path = path.into();
        let name = match path.strip_prefix(root) {
            Ok(rel) => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        Self {
            format: format_of(&path),
            name,
            path,
        }
    }
}

/// Lower-cased extension of `path`, or `""`.
pub fn format_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}
