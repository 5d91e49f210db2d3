// src/archive/mod.rs
//! Recursive zip extraction.
//!
//! Nested archives are walked with an explicit stack of open archives rather
//! than by recursion, and every archive is identified by the SHA-256 of its
//! bytes so that a container holding (a copy of) itself is entered only once.
//! Output order is depth-first in entry order: the contents of a nested
//! archive appear where that archive sat among its siblings.

mod descriptor;

pub use descriptor::{format_of, ArchiveEntry, FileDescriptor};

use sha2::{Digest, Sha256};
use std::{
    collections::{HashMap, HashSet},
    fs::{self, File},
    io::{self, Cursor, Read},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::diagnostics::{Diagnostics, SkipReason};
use crate::error::{Error, Result};

/// Where the top-level archive comes from.
#[derive(Debug, Clone)]
pub enum ArchiveSource {
    /// Bytes already in memory, typically a finished download.
    Bytes { name: String, bytes: Vec<u8> },
    Path(PathBuf),
}

impl ArchiveSource {
    fn into_parts(self) -> Result<(String, Vec<u8>)> {
        match self {
            ArchiveSource::Bytes { name, bytes } => Ok((name, bytes)),
            ArchiveSource::Path(path) => {
                let bytes = fs::read(&path).map_err(|e| Error::io(&path, e))?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                Ok((name, bytes))
            }
        }
    }
}

type ArchiveId = [u8; 32];

/// Upper bound on the buffer preallocated for a nested archive.
const MAX_SIZE_HINT: u64 = 64 << 20;

/// An archive being walked, plus the index of its next unvisited entry.
struct Frame {
    label: String,
    id: ArchiveId,
    archive: ZipArchive<Cursor<Vec<u8>>>,
    next: usize,
}

/// Unpack `source` into `dest`, following nested `.zip` entries, and return a
/// descriptor for every plain file reached.
///
/// A top-level archive that cannot be opened is an [`Error::Extraction`].
/// Corrupt nested archives, unsafe entries, entries that cannot be
/// written, and archives already seen in this run are logged, counted in
/// `diag`, and skipped.
pub fn extract_archive(
    source: ArchiveSource,
    dest: impl AsRef<Path>,
    diag: &Diagnostics,
) -> Result<Vec<FileDescriptor>> {
    Extractor::new(dest.as_ref(), diag)?.extract(source)
}

/// Extraction state for one run: every archive unpacked into the same
/// directory shares the set of archives already entered and the record of
/// which archive wrote which path.
pub struct Extractor<'a> {
    dest: &'a Path,
    diag: &'a Diagnostics,
    seen: HashSet<ArchiveId>,
    /// target path → id of the archive that wrote it in this run
    written: HashMap<PathBuf, ArchiveId>,
    /// directories created or implied by a write in this run
    dirs: HashSet<PathBuf>,
    out: Vec<FileDescriptor>,
}

impl<'a> Extractor<'a> {
    pub fn new(dest: &'a Path, diag: &'a Diagnostics) -> Result<Self> {
        fs::create_dir_all(dest).map_err(|e| Error::io(dest, e))?;
        Ok(Self {
            dest,
            diag,
            seen: HashSet::new(),
            written: HashMap::new(),
            dirs: HashSet::new(),
            out: Vec::new(),
        })
    }

    pub fn dest(&self) -> &Path {
        self.dest
    }

    /// Walk one top-level archive depth-first and return the files it
    /// produced, in entry order.
    #[tracing::instrument(level = "info", skip_all, fields(dest = %self.dest.display()))]
    pub fn extract(&mut self, source: ArchiveSource) -> Result<Vec<FileDescriptor>> {
        let (label, bytes) = source.into_parts()?;
        let id = digest(&bytes);
        if !self.seen.insert(id) {
            warn!(archive = %label, "archive already unpacked in this run, not re-entering");
            return Ok(Vec::new());
        }
        let archive = ZipArchive::new(Cursor::new(bytes)).map_err(|source| Error::Extraction {
            archive: label.clone(),
            source,
        })?;
        info!(archive = %label, entries = archive.len(), "extracting");

        let mut stack = vec![Frame {
            label,
            id,
            archive,
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            if frame.next >= frame.archive.len() {
                debug!(archive = %frame.label, "archive done");
                stack.pop();
                continue;
            }
            let idx = frame.next;
            frame.next += 1;

            if let Some((label, bytes)) = self.visit(frame, idx)? {
                if let Some(nested) = self.open_nested(label, bytes) {
                    stack.push(nested);
                }
            }
        }

        let files = std::mem::take(&mut self.out);
        info!(files = files.len(), "extraction complete");
        Ok(files)
    }

    /// Write a loose (non-archive) file at `rel` under the destination,
    /// namespaced like an archive entry if another source already wrote
    /// that path.
    pub fn place(&mut self, rel: &Path, bytes: &[u8]) -> Result<FileDescriptor> {
        let label = rel.to_string_lossy().into_owned();
        let target = self.target_for(rel, &label, digest(bytes));
        if let Err(e) = write_entry(&target, &mut &bytes[..]) {
            self.written.remove(&target);
            return Err(Error::io(target, e));
        }
        Ok(FileDescriptor::from_path(target, self.dest))
    }
}

impl Extractor<'_> {
    /// Handle entry `idx` of `frame`. Returns the bytes of a nested archive
    /// that should be descended into next.
    fn visit(&mut self, frame: &mut Frame, idx: usize) -> Result<Option<(String, Vec<u8>)>> {
        let mut file = match frame.archive.by_index(idx) {
            Ok(f) => f,
            Err(e) => {
                let name = format!("{}#{}", frame.label, idx);
                self.diag.file_skipped(&name, SkipReason::Extraction, e);
                return Ok(None);
            }
        };

        let raw_name = file.name().to_string();
        let Some(rel) = file.enclosed_name() else {
            let name = format!("{}/{}", frame.label, raw_name);
            self.diag
                .file_skipped(&name, SkipReason::Extraction, "entry escapes the archive root");
            return Ok(None);
        };
        let entry = ArchiveEntry::new(rel, file.is_dir());

        if entry.is_directory {
            let dir = self.dest.join(&entry.path);
            if self.written.contains_key(&dir) || self.under_written_file(&dir) {
                debug!(dir = %dir.display(), archive = %frame.label, "directory shadowed by a file");
                return Ok(None);
            }
            if let Err(e) = fs::create_dir_all(&dir) {
                let name = format!("{}/{}", frame.label, raw_name);
                self.diag.file_skipped(&name, SkipReason::Extraction, e);
                return Ok(None);
            }
            self.claim_dirs(&dir);
            return Ok(None);
        }

        if entry.is_zip {
            let label = format!("{}/{}", frame.label, raw_name);
            // declared sizes are untrusted, so only a bounded hint
            let mut buf = Vec::with_capacity(file.size().min(MAX_SIZE_HINT) as usize);
            return match file.read_to_end(&mut buf) {
                Ok(_) => Ok(Some((label, buf))),
                Err(e) => {
                    self.diag.file_skipped(&label, SkipReason::Extraction, e);
                    Ok(None)
                }
            };
        }

        let target = self.target_for(&entry.path, &frame.label, frame.id);
        if let Err(e) = write_entry(&target, &mut file) {
            self.written.remove(&target);
            let name = format!("{}/{}", frame.label, raw_name);
            self.diag.file_skipped(&name, SkipReason::Extraction, e);
            return Ok(None);
        }

        let desc = FileDescriptor::from_path(target, self.dest);
        debug!(file = %desc.name, archive = %frame.label, "extracted");
        self.out.push(desc);
        Ok(None)
    }

    /// Flat destination path for an entry. The entry is moved under a
    /// directory named after the writing archive instead when the flat path
    /// was already written by a different archive, is a directory made in
    /// this run, or lies below a file written in this run.
    fn target_for(&mut self, rel: &Path, label: &str, id: ArchiveId) -> PathBuf {
        let flat = self.dest.join(rel);
        let clash = match self.written.get(&flat) {
            Some(owner) => *owner != id,
            None => self.dirs.contains(&flat) || self.under_written_file(&flat),
        };
        let target = if clash {
            let ns = self.dest.join(namespace_dir(label, &id)).join(rel);
            warn!(
                entry = %rel.display(),
                archive = %label,
                to = %ns.display(),
                "name collision, namespacing"
            );
            ns
        } else {
            flat
        };
        if let Some(parent) = target.parent() {
            self.claim_dirs(parent);
        }
        self.written.insert(target.clone(), id);
        target
    }

    /// Whether a proper ancestor of `path` was written as a file this run.
    fn under_written_file(&self, path: &Path) -> bool {
        path.ancestors()
            .skip(1)
            .take_while(|a| *a != self.dest)
            .any(|a| self.written.contains_key(a))
    }

    /// Record `dir` and its ancestors below the destination as directories.
    fn claim_dirs(&mut self, dir: &Path) {
        let dest = self.dest;
        for a in dir.ancestors().take_while(|a| *a != dest) {
            self.dirs.insert(a.to_path_buf());
        }
    }

    fn open_nested(&mut self, label: String, bytes: Vec<u8>) -> Option<Frame> {
        let id = digest(&bytes);
        if !self.seen.insert(id) {
            warn!(archive = %label, "archive already unpacked in this run, not re-entering");
            return None;
        }
        match ZipArchive::new(Cursor::new(bytes)) {
            Ok(archive) => {
                debug!(archive = %label, entries = archive.len(), "descending");
                Some(Frame {
                    label,
                    id,
                    archive,
                    next: 0,
                })
            }
            Err(source) => {
                let err = Error::Extraction {
                    archive: label.clone(),
                    source,
                };
                self.diag.file_skipped(&label, SkipReason::Extraction, err);
                None
            }
        }
    }
}

/// Create `target` and its parents, then stream `src` into it. A partial
/// file is removed on failure.
fn write_entry(target: &Path, src: &mut impl Read) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = File::create(target)?;
    if let Err(e) = io::copy(src, &mut out) {
        drop(out);
        let _ = fs::remove_file(target);
        return Err(e);
    }
    Ok(())
}

fn digest(bytes: &[u8]) -> ArchiveId {
    Sha256::digest(bytes).into()
}

/// `<archive stem>_<first 4 digest bytes as hex>`
fn namespace_dir(label: &str, id: &ArchiveId) -> String {
    let stem = Path::new(label.rsplit('/').next().unwrap_or(label))
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".into());
    format!(
        "{}_{:02x}{:02x}{:02x}{:02x}",
        stem, id[0], id[1], id[2], id[3]
    )
}
