use anyhow::{Context, Result};
use arrow::array::Array;
use clap::Parser;
use glob::glob;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::reader::{FileReader, SerializedFileReader};
use ridership::schema::CanonicalField;
use std::{fs::File, path::PathBuf};

/// Print schema, row count and per-column null counts of a persisted
/// ridership table.
#[derive(Parser, Debug)]
struct Args {
    /// Table directory holding `part-*.parquet`, or a single Parquet file
    path: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let parts: Vec<PathBuf> = if args.path.is_dir() {
        let pattern = format!("{}/part-*.parquet", args.path.display());
        let mut parts = glob(&pattern)?.collect::<Result<Vec<_>, _>>()?;
        parts.sort();
        parts
    } else {
        vec![args.path.clone()]
    };
    if parts.is_empty() {
        anyhow::bail!("no parquet parts under {}", args.path.display());
    }

    let mut total_rows = 0i64;
    let mut nulls = vec![0usize; CanonicalField::ALL.len()];
    let mut columns: Vec<String> = Vec::new();

    for part in &parts {
        let reader = SerializedFileReader::new(
            File::open(part).with_context(|| format!("opening {}", part.display()))?,
        )?;
        let meta = reader.metadata().file_metadata();
        total_rows += meta.num_rows();
        println!("=== {} ({} rows) ===", part.display(), meta.num_rows());

        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(part)?)?;
        if columns.is_empty() {
            println!("=== Schema ===");
            for field in builder.schema().fields() {
                println!(
                    "- {:<20} | {:<30} | nullable: {}",
                    field.name(),
                    format!("{:?}", field.data_type()),
                    field.is_nullable()
                );
                columns.push(field.name().clone());
            }
            println!();
        }
        for batch in builder.build()? {
            let batch = batch?;
            for (i, col) in batch.columns().iter().enumerate() {
                if let Some(n) = nulls.get_mut(i) {
                    *n += col.null_count();
                }
            }
        }
    }

    println!("Parts:      {}", parts.len());
    println!("Total rows: {}", total_rows);
    println!();
    println!("=== Null counts ===");
    for (name, n) in columns.iter().zip(&nulls) {
        println!("- {:<20} {}", name, n);
    }
    Ok(())
}
