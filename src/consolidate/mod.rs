// src/consolidate/mod.rs

mod batch;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::schema::{CanonicalField, FIELD_COUNT};
use crate::validate::CanonicalRow;

/// Validated rows of one file, plus which canonical fields it supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRows {
    pub name: String,
    pub rows: Vec<CanonicalRow>,
    pub present: [bool; FIELD_COUNT],
}

/// How consistently each canonical field was populated across the files
/// that made it into the master table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Coverage {
    pub files: usize,
    /// Per field, in canonical order: files that had no column for it.
    pub missing: [usize; FIELD_COUNT],
}

impl Coverage {
    /// Fields some files supply and others don't. Rows from the latter
    /// carry nulls there.
    pub fn sparse_fields(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL
            .into_iter()
            .filter(|f| {
                let m = self.missing[f.index()];
                m > 0 && m < self.files
            })
            .collect()
    }

    pub fn absent_fields(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL
            .into_iter()
            .filter(|f| self.files > 0 && self.missing[f.index()] == self.files)
            .collect()
    }
}

/// The merged, validated output of a run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterTable {
    rows: Vec<CanonicalRow>,
    coverage: Coverage,
}

impl MasterTable {
    pub fn rows(&self) -> &[CanonicalRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn num_columns(&self) -> usize {
        FIELD_COUNT
    }

    pub fn coverage(&self) -> &Coverage {
        &self.coverage
    }
}

/// Concatenate per-file results in the order given. `None` marks a file
/// that was skipped upstream; it contributes nothing but still counts as
/// an input.
///
/// Fails with [`Error::Consolidation`] when there were no inputs at all or
/// when not a single row survived.
pub fn consolidate(results: Vec<Option<FileRows>>) -> Result<MasterTable> {
    if results.is_empty() {
        return Err(Error::Consolidation("no input files".into()));
    }
    let inputs = results.len();

    let contributing: Vec<FileRows> = results
        .into_iter()
        .flatten()
        .filter(|f| !f.rows.is_empty())
        .collect();
    let total: usize = contributing.iter().map(|f| f.rows.len()).sum();
    if total == 0 {
        return Err(Error::Consolidation(format!(
            "none of {} input files produced a valid row",
            inputs
        )));
    }

    let mut coverage = Coverage {
        files: contributing.len(),
        ..Default::default()
    };
    let mut rows = Vec::with_capacity(total);
    for file in contributing {
        for f in CanonicalField::ALL {
            if !file.present[f.index()] {
                coverage.missing[f.index()] += 1;
            }
        }
        rows.extend(file.rows);
    }

    for f in coverage.sparse_fields() {
        warn!(
            field = %f,
            files_without = coverage.missing[f.index()],
            files = coverage.files,
            "column populated only in some files"
        );
    }

    let table = MasterTable { rows, coverage };
    info!(
        rows = table.len(),
        columns = table.num_columns(),
        inputs,
        "consolidation complete"
    );
    Ok(table)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub(crate) fn row(trip: &str, start_station: i64) -> CanonicalRow {
        let t = NaiveDate::from_ymd_opt(2022, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        CanonicalRow {
            trip_id: Some(trip.into()),
            start_time: t,
            end_time: t,
            trip_duration: Some("600".into()),
            start_station_id: start_station,
            start_station_name: Some("Bay St".into()),
            end_station_id: 7000,
            end_station_name: None,
            bike_id: None,
            user_type: Some("Casual Member".into()),
        }
    }

    fn file(name: &str, rows: Vec<CanonicalRow>, bike: bool) -> FileRows {
        let mut present = [true; FIELD_COUNT];
        present[CanonicalField::BikeId.index()] = bike;
        FileRows {
            name: name.into(),
            rows,
            present,
        }
    }

    #[test]
    fn merges_in_input_order() {
        let table = consolidate(vec![
            Some(file("a", vec![row("1", 1), row("2", 2)], true)),
            None,
            Some(file("b", vec![row("3", 3)], true)),
        ])
        .unwrap();
        let ids: Vec<_> = table
            .rows()
            .iter()
            .map(|r| r.trip_id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(table.num_columns(), 10);
    }

    #[test]
    fn empty_input_list_is_fatal() {
        assert!(matches!(consolidate(vec![]), Err(Error::Consolidation(_))));
    }

    #[test]
    fn all_files_empty_or_skipped_is_fatal() {
        let err = consolidate(vec![None, Some(file("a", vec![], true)), None]).unwrap_err();
        assert!(matches!(err, Error::Consolidation(_)));
    }

    #[test]
    fn flags_columns_missing_from_some_eras() {
        let table = consolidate(vec![
            Some(file("2016", vec![row("1", 1)], false)),
            Some(file("2022", vec![row("2", 2)], true)),
            Some(file("empty", vec![], false)),
        ])
        .unwrap();
        let cov = table.coverage();
        assert_eq!(cov.files, 2);
        assert_eq!(cov.sparse_fields(), vec![CanonicalField::BikeId]);
        assert!(cov.absent_fields().is_empty());
    }
}
