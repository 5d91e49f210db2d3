use tracing::{debug, warn};

use super::{AliasTable, CanonicalField, FIELD_COUNT};
use crate::ingest::RawTable;

/// Cell values in canonical schema order.
pub type CanonicalValues = [Option<String>; FIELD_COUNT];

/// A file's rows after renaming onto the canonical schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedTable {
    pub rows: Vec<CanonicalValues>,
    /// Whether the source file had any column for each field.
    pub present: [bool; FIELD_COUNT],
}

impl NormalizedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has(&self, field: CanonicalField) -> bool {
        self.present[field.index()]
    }
}

/// Rename every recognised column of `raw` to its canonical field and drop
/// the rest. When several source columns land on the same field (a
/// workbook whose sheets spell a header differently), the first non-empty
/// one in header order wins for each row.
pub fn normalize(raw: RawTable, aliases: &AliasTable) -> NormalizedTable {
    let mapping: Vec<Option<CanonicalField>> = raw
        .headers
        .iter()
        .map(|h| {
            let field = aliases.resolve(h);
            if field.is_none() {
                debug!(column = %h, "unrecognised column dropped");
            }
            field
        })
        .collect();

    let mut present = [false; FIELD_COUNT];
    for field in mapping.iter().flatten() {
        if present[field.index()] {
            warn!(field = %field, "several source columns map to one field, coalescing");
        }
        present[field.index()] = true;
    }

    let rows = raw
        .rows
        .into_iter()
        .map(|row| {
            let mut out: CanonicalValues = Default::default();
            for (cell, field) in row.into_iter().zip(&mapping) {
                if let (Some(value), Some(field)) = (cell, field) {
                    let slot = &mut out[field.index()];
                    if slot.is_none() {
                        *slot = Some(value);
                    }
                }
            }
            out
        })
        .collect();

    NormalizedTable { rows, present }
}
