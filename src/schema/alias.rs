use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};

use super::CanonicalField::{self, *};
use crate::error::{Error, Result};
use crate::ingest::ColumnFilter;

/// Bumped whenever a built-in era is added or changed.
pub const ALIAS_TABLE_VERSION: u32 = 1;

type EraSpec = (&'static str, &'static [(&'static str, CanonicalField)]);

/// Column names seen in published ridership files, grouped by the period
/// that used them.
const BUILTIN_ERAS: &[EraSpec] = &[
    (
        "canonical",
        &[
            ("trip_id", TripId),
            ("start_time", StartTime),
            ("end_time", EndTime),
            ("trip_duration", TripDuration),
            ("start_station_id", StartStationId),
            ("start_station_name", StartStationName),
            ("end_station_id", EndStationId),
            ("end_station_name", EndStationName),
            ("bike_id", BikeId),
            ("user_type", UserType),
        ],
    ),
    (
        "2014-2016",
        &[
            ("trip_id", TripId),
            ("trip_start_time", StartTime),
            ("trip_stop_time", EndTime),
            ("trip_duration_seconds", TripDuration),
            ("from_station_id", StartStationId),
            ("from_station_name", StartStationName),
            ("to_station_id", EndStationId),
            ("to_station_name", EndStationName),
            ("user_type", UserType),
        ],
    ),
    (
        "2017-present",
        &[
            ("trip id", TripId),
            ("start time", StartTime),
            ("end time", EndTime),
            ("trip duration", TripDuration),
            ("start station id", StartStationId),
            ("start station name", StartStationName),
            ("end station id", EndStationId),
            ("end station name", EndStationName),
            ("bike id", BikeId),
            ("user type", UserType),
        ],
    ),
];

static BUILTIN: Lazy<AliasTable> = Lazy::new(|| {
    let mut table = AliasTable::empty();
    for (era, entries) in BUILTIN_ERAS {
        table
            .add_era(era, entries.iter().copied())
            .expect("built-in alias eras must not conflict");
    }
    table
});

/// Normalised lookup key: trimmed, BOM-free, lower-case, inner whitespace
/// runs collapsed to one space (so `Trip  Duration` finds `trip duration`).
pub fn column_key(name: &str) -> String {
    name.trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Historical column name → canonical field.
#[derive(Debug, Clone)]
pub struct AliasTable {
    map: HashMap<String, CanonicalField>,
    eras: Vec<String>,
}

impl AliasTable {
    pub fn empty() -> Self {
        Self {
            map: HashMap::new(),
            eras: Vec::new(),
        }
    }

    /// Every era shipped with this crate.
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Built-in eras plus a `configured` era built from
    /// `canonical name → aliases`.
    pub fn with_extra(extra: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut table = Self::builtin();
        if extra.is_empty() {
            return Ok(table);
        }
        let mut entries = Vec::new();
        for (field, aliases) in extra {
            let field: CanonicalField = field.parse().map_err(Error::Config)?;
            entries.extend(aliases.iter().map(|a| (a.as_str(), field)));
        }
        table.add_era("configured", entries)?;
        Ok(table)
    }

    /// Add one naming era. An alias already mapped to a different field is
    /// an [`Error::AliasConflict`] and leaves the table unchanged.
    pub fn add_era<'a>(
        &mut self,
        era: &str,
        entries: impl IntoIterator<Item = (&'a str, CanonicalField)>,
    ) -> Result<()> {
        let mut staged: HashMap<String, CanonicalField> = HashMap::new();
        for (alias, field) in entries {
            let key = column_key(alias);
            let existing = self.map.get(&key).or_else(|| staged.get(&key));
            match existing {
                Some(prev) if *prev != field => {
                    return Err(Error::AliasConflict {
                        alias: key,
                        first: prev.to_string(),
                        second: field.to_string(),
                    });
                }
                _ => {
                    staged.insert(key, field);
                }
            }
        }
        self.map.extend(staged);
        self.eras.push(era.to_string());
        Ok(())
    }

    pub fn resolve(&self, column: &str) -> Option<CanonicalField> {
        self.map.get(&column_key(column)).copied()
    }

    pub fn eras(&self) -> &[String] {
        &self.eras
    }

    pub fn version(&self) -> u32 {
        ALIAS_TABLE_VERSION
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl ColumnFilter for AliasTable {
    fn allows(&self, column: &str) -> bool {
        self.resolve(column).is_some()
    }
}
