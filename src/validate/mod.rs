// src/validate/mod.rs
//! Row-level invariants. Rows that break one are dropped and counted, never
//! repaired.
//!
//! Checks run in this order, and a row is charged to the first it fails:
//! 1. header drift: already folded away, since [`NormalizedTable`] rows are
//!    keyed by [`CanonicalField`] via the lower-cased alias lookup;
//! 2. `start_time` then `end_time` must parse;
//! 3. each endpoint needs a station id or a station name;
//! 4. both station ids must be non-negative integers.

pub mod date_parser;
pub mod station;

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::diagnostics::Diagnostics;
use crate::schema::{CanonicalField, CanonicalValues, NormalizedTable};
use date_parser::parse_timestamp;
use station::{is_null, parse_station_id};

/// Why a row was dropped.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationError {
    #[error("start_time missing or unparsable")]
    UnparsableStartTime,
    #[error("end_time missing or unparsable")]
    UnparsableEndTime,
    #[error("trip endpoint has neither station id nor station name")]
    UnattributableStation,
    #[error("station id is not a non-negative integer")]
    InvalidStationId,
}

/// A row that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRow {
    pub trip_id: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub trip_duration: Option<String>,
    pub start_station_id: i64,
    pub start_station_name: Option<String>,
    pub end_station_id: i64,
    pub end_station_name: Option<String>,
    pub bike_id: Option<String>,
    pub user_type: Option<String>,
}

pub fn validate_row(mut values: CanonicalValues) -> Result<CanonicalRow, ValidationError> {
    use CanonicalField::*;

    let start_time = values[StartTime.index()]
        .as_deref()
        .and_then(parse_timestamp)
        .ok_or(ValidationError::UnparsableStartTime)?;
    let end_time = values[EndTime.index()]
        .as_deref()
        .and_then(parse_timestamp)
        .ok_or(ValidationError::UnparsableEndTime)?;

    for (id, name) in [
        (StartStationId, StartStationName),
        (EndStationId, EndStationName),
    ] {
        if is_null(values[id.index()].as_deref()) && is_null(values[name.index()].as_deref()) {
            return Err(ValidationError::UnattributableStation);
        }
    }

    let station = |f: CanonicalField| {
        values[f.index()]
            .as_deref()
            .and_then(parse_station_id)
            .ok_or(ValidationError::InvalidStationId)
    };
    let start_station_id = station(StartStationId)?;
    let end_station_id = station(EndStationId)?;

    let mut take = |f: CanonicalField| values[f.index()].take();
    let start_station_name = take(StartStationName).filter(|n| !is_null(Some(n.as_str())));
    let end_station_name = take(EndStationName).filter(|n| !is_null(Some(n.as_str())));

    Ok(CanonicalRow {
        trip_id: take(TripId),
        start_time,
        end_time,
        trip_duration: take(TripDuration),
        start_station_id,
        start_station_name,
        end_station_id,
        end_station_name,
        bike_id: take(BikeId),
        user_type: take(UserType),
    })
}

/// Outcome of validating one file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub kept: usize,
    pub dropped: BTreeMap<ValidationError, usize>,
}

/// Keep the rows of `table` that satisfy every invariant, in order, and
/// report drop counts for `name` to `diag`.
pub fn validate(
    table: NormalizedTable,
    name: &str,
    diag: &Diagnostics,
) -> (Vec<CanonicalRow>, ValidationReport) {
    let mut report = ValidationReport::default();
    let mut rows = Vec::with_capacity(table.len());

    for values in table.rows {
        match validate_row(values) {
            Ok(row) => rows.push(row),
            Err(reason) => *report.dropped.entry(reason).or_default() += 1,
        }
    }
    report.kept = rows.len();

    for (reason, count) in &report.dropped {
        diag.rows_dropped(name, *reason, *count);
    }
    diag.rows_kept(report.kept);
    (rows, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use CanonicalField::*;

    fn values(pairs: &[(CanonicalField, &str)]) -> CanonicalValues {
        let mut v: CanonicalValues = Default::default();
        for (f, s) in pairs {
            v[f.index()] = Some(s.to_string());
        }
        v
    }

    fn good() -> Vec<(CanonicalField, &'static str)> {
        vec![
            (TripId, "712382"),
            (StartTime, "1/1/2018 0:47"),
            (EndTime, "1/1/2018 0:54"),
            (StartStationId, "7017"),
            (StartStationName, "Widmer St / Adelaide St"),
            (EndStationId, "7239.0"),
            (EndStationName, "Bathurst St / Queens Quay W"),
            (UserType, "Annual Member"),
        ]
    }

    fn with(
        mut base: Vec<(CanonicalField, &'static str)>,
        f: CanonicalField,
        v: &'static str,
    ) -> CanonicalValues {
        base.retain(|(k, _)| *k != f);
        base.push((f, v));
        values(&base)
    }

    #[test]
    fn valid_row_is_typed() {
        let row = validate_row(values(&good())).unwrap();
        assert_eq!(row.start_station_id, 7017);
        assert_eq!(row.end_station_id, 7239);
        assert_eq!(row.start_time.to_string(), "2018-01-01 00:47:00");
        assert_eq!(row.trip_id.as_deref(), Some("712382"));
        assert_eq!(row.bike_id, None);
    }

    #[test]
    fn each_invariant_has_its_own_reason() {
        assert_eq!(
            validate_row(with(good(), StartTime, "soon")),
            Err(ValidationError::UnparsableStartTime)
        );
        assert_eq!(
            validate_row(with(good(), EndTime, "")),
            Err(ValidationError::UnparsableEndTime)
        );
        assert_eq!(
            validate_row(with(good(), StartStationId, "12.5")),
            Err(ValidationError::InvalidStationId)
        );
        assert_eq!(
            validate_row(with(good(), EndStationId, "NaN")),
            Err(ValidationError::InvalidStationId)
        );
    }

    #[test]
    fn null_endpoint_is_unattributable() {
        let mut v = good();
        v.retain(|(k, _)| *k != EndStationId && *k != EndStationName);
        v.push((EndStationId, "NULL"));
        v.push((EndStationName, "null"));
        assert_eq!(
            validate_row(values(&v)),
            Err(ValidationError::UnattributableStation)
        );
    }

    #[test]
    fn name_without_id_still_fails_the_id_check() {
        let mut v = good();
        v.retain(|(k, _)| *k != StartStationId);
        assert_eq!(
            validate_row(values(&v)),
            Err(ValidationError::InvalidStationId)
        );
    }

    #[test]
    fn literal_null_names_become_absent() {
        let row = validate_row(with(good(), StartStationName, "NULL")).unwrap();
        assert_eq!(row.start_station_name, None);
    }

    #[test]
    fn start_after_end_is_not_checked() {
        let mut v = good();
        v.retain(|(k, _)| *k != StartTime && *k != EndTime);
        v.push((StartTime, "2018-01-02 00:00:00"));
        v.push((EndTime, "2018-01-01 00:00:00"));
        assert!(validate_row(values(&v)).is_ok());
    }

    #[test]
    fn validate_keeps_order_and_reports_drops() {
        let mut null_end = good();
        null_end.retain(|(k, _)| *k != EndStationId && *k != EndStationName);
        null_end.push((EndStationId, "NULL"));
        null_end.push((EndStationName, "NULL"));

        let table = NormalizedTable {
            rows: vec![
                with(good(), TripId, "1"),
                values(&null_end),
                with(good(), TripId, "3"),
                with(good(), StartTime, "?"),
            ],
            present: [true; crate::schema::FIELD_COUNT],
        };
        let diag = Diagnostics::new();
        let (rows, report) = validate(table, "t.csv", &diag);

        let ids: Vec<_> = rows.iter().map(|r| r.trip_id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(report.kept, 2);
        assert_eq!(report.dropped[&ValidationError::UnattributableStation], 1);
        assert_eq!(report.dropped[&ValidationError::UnparsableStartTime], 1);

        let s = diag.snapshot();
        assert_eq!(s.rows_kept, 2);
        assert_eq!(s.total_dropped(), 2);
    }
}
