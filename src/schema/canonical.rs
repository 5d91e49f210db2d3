use serde::Serialize;
use std::{fmt, str::FromStr};

/// The fixed, ordered output columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    TripId,
    StartTime,
    EndTime,
    TripDuration,
    StartStationId,
    StartStationName,
    EndStationId,
    EndStationName,
    BikeId,
    UserType,
}

pub const FIELD_COUNT: usize = 10;

impl CanonicalField {
    /// Schema order.
    pub const ALL: [CanonicalField; FIELD_COUNT] = [
        CanonicalField::TripId,
        CanonicalField::StartTime,
        CanonicalField::EndTime,
        CanonicalField::TripDuration,
        CanonicalField::StartStationId,
        CanonicalField::StartStationName,
        CanonicalField::EndStationId,
        CanonicalField::EndStationName,
        CanonicalField::BikeId,
        CanonicalField::UserType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::TripId => "trip_id",
            CanonicalField::StartTime => "start_time",
            CanonicalField::EndTime => "end_time",
            CanonicalField::TripDuration => "trip_duration",
            CanonicalField::StartStationId => "start_station_id",
            CanonicalField::StartStationName => "start_station_name",
            CanonicalField::EndStationId => "end_station_id",
            CanonicalField::EndStationName => "end_station_name",
            CanonicalField::BikeId => "bike_id",
            CanonicalField::UserType => "user_type",
        }
    }

    /// Position in [`CanonicalField::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanonicalField::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("`{}` is not a canonical field", s))
    }
}
