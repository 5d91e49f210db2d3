// src/schema/arrow.rs

use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema, TimeUnit};
use std::sync::Arc;

use super::CanonicalField;

/// Arrow type of each canonical column.
///
/// - start_time, end_time          → Timestamp(µs), never null
/// - start/end_station_id          → Int64, never null
/// - everything else               → Utf8, nullable (kept as published)
pub fn map_to_arrow_type(field: CanonicalField) -> (DataType, bool) {
    match field {
        CanonicalField::StartTime | CanonicalField::EndTime => {
            (DataType::Timestamp(TimeUnit::Microsecond, None), false)
        }
        CanonicalField::StartStationId | CanonicalField::EndStationId => (DataType::Int64, false),
        _ => (DataType::Utf8, true),
    }
}

/// Schema of the master table, columns in canonical order.
pub fn build_arrow_schema() -> Arc<ArrowSchema> {
    let fields: Vec<ArrowField> = CanonicalField::ALL
        .iter()
        .map(|f| {
            let (dt, nullable) = map_to_arrow_type(*f);
            ArrowField::new(f.as_str(), dt, nullable)
        })
        .collect();

    Arc::new(ArrowSchema::new(fields))
}
