use arrow::{
    array::{ArrayRef, Int64Array, StringArray, TimestampMicrosecondArray},
    record_batch::RecordBatch,
};
use std::sync::Arc;

use super::MasterTable;
use crate::error::Result;
use crate::schema::{build_arrow_schema, CanonicalField};
use crate::validate::CanonicalRow;

impl MasterTable {
    /// The whole table as one Arrow batch, columns in canonical order.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let rows = &self.rows;
        let text = |get: fn(&CanonicalRow) -> Option<&str>| -> ArrayRef {
            Arc::new(rows.iter().map(get).collect::<StringArray>())
        };
        let micros = |get: fn(&CanonicalRow) -> i64| -> ArrayRef {
            Arc::new(TimestampMicrosecondArray::from(
                rows.iter().map(get).collect::<Vec<_>>(),
            ))
        };
        let int = |get: fn(&CanonicalRow) -> i64| -> ArrayRef {
            Arc::new(Int64Array::from(rows.iter().map(get).collect::<Vec<_>>()))
        };

        let columns: Vec<ArrayRef> = CanonicalField::ALL
            .iter()
            .map(|f| match f {
                CanonicalField::TripId => text(|r| r.trip_id.as_deref()),
                CanonicalField::StartTime => micros(|r| r.start_time.and_utc().timestamp_micros()),
                CanonicalField::EndTime => micros(|r| r.end_time.and_utc().timestamp_micros()),
                CanonicalField::TripDuration => text(|r| r.trip_duration.as_deref()),
                CanonicalField::StartStationId => int(|r| r.start_station_id),
                CanonicalField::StartStationName => text(|r| r.start_station_name.as_deref()),
                CanonicalField::EndStationId => int(|r| r.end_station_id),
                CanonicalField::EndStationName => text(|r| r.end_station_name.as_deref()),
                CanonicalField::BikeId => text(|r| r.bike_id.as_deref()),
                CanonicalField::UserType => text(|r| r.user_type.as_deref()),
            })
            .collect();

        Ok(RecordBatch::try_new(build_arrow_schema(), columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::{consolidate, tests::row, FileRows};
    use crate::schema::FIELD_COUNT;
    use arrow::array::Array;

    use super::*;

    #[test]
    fn batch_matches_table() {
        let table = consolidate(vec![Some(FileRows {
            name: "a".into(),
            rows: vec![row("1", 7001), row("2", 7002)],
            present: [true; FIELD_COUNT],
        })])
        .unwrap();
        let batch = table.to_record_batch().unwrap();

        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 10);
        let ids = batch
            .column_by_name("start_station_id")
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(ids.value(1), 7002);
        let bikes = batch.column_by_name("bike_id").unwrap();
        assert_eq!(bikes.null_count(), 2);
    }
}
