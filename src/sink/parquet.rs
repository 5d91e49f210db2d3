use glob::{glob, Pattern};
use parquet::{
    arrow::ArrowWriter,
    basic::Compression,
    file::properties::WriterProperties,
};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::info;

use super::{Sink, WriteMode};
use crate::consolidate::MasterTable;
use crate::error::{Error, Result};

/// Stores a table as numbered Parquet parts under `<dir>/<table>/`.
pub struct ParquetSink {
    table_dir: PathBuf,
}

impl ParquetSink {
    pub fn new(dir: impl AsRef<Path>, table: &str) -> Result<Self> {
        let table_dir = dir.as_ref().join(table);
        fs::create_dir_all(&table_dir).map_err(|e| Error::io(&table_dir, e))?;
        Ok(Self { table_dir })
    }

    pub fn table_dir(&self) -> &Path {
        &self.table_dir
    }

    /// Existing parts, in name (and therefore write) order.
    pub fn parts(&self) -> Result<Vec<PathBuf>> {
        let pattern = format!(
            "{}/part-*.parquet",
            Pattern::escape(&self.table_dir.to_string_lossy())
        );
        let mut parts = Vec::new();
        for entry in glob(&pattern).map_err(|e| Error::Config(e.to_string()))? {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                Error::io(path, e.into())
            })?;
            parts.push(path);
        }
        parts.sort();
        Ok(parts)
    }

    fn write_part(&self, table: &MasterTable, path: &Path) -> Result<u64> {
        let batch = table.to_record_batch()?;
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
        let meta = fs::metadata(path).map_err(|e| Error::io(path, e))?;
        Ok(meta.len())
    }
}

/// Number of a `part-NNNNN.parquet` file, if the name carries one.
fn part_index(path: &Path) -> Option<u64> {
    path.file_name()?
        .to_str()?
        .strip_prefix("part-")?
        .strip_suffix(".parquet")?
        .parse()
        .ok()
}

impl Sink for ParquetSink {
    fn write(&mut self, table: &MasterTable, mode: WriteMode) -> Result<()> {
        let existing = self.parts()?;
        let index = match mode {
            WriteMode::Replace => 0,
            WriteMode::Append => existing
                .iter()
                .filter_map(|p| part_index(p))
                .max()
                .map_or(0, |i| i + 1),
        };
        let final_path = self.table_dir.join(format!("part-{:05}.parquet", index));
        let tmp_path = self.table_dir.join(format!(".part-{:05}.parquet.tmp", index));

        // write aside first so a failed write leaves the old table intact
        let bytes = self.write_part(table, &tmp_path)?;

        if mode == WriteMode::Replace {
            for old in existing {
                fs::remove_file(&old).map_err(|e| Error::io(&old, e))?;
            }
        }
        fs::rename(&tmp_path, &final_path).map_err(|e| Error::io(&final_path, e))?;

        info!(
            path = %final_path.display(),
            rows = table.len(),
            bytes,
            mode = ?mode,
            "table written"
        );
        Ok(())
    }
}
