//! Canonical schema, historical aliases, and per-file renaming.

pub mod alias;
pub mod arrow;
pub mod canonical;
pub mod normalize;

pub use alias::{column_key, AliasTable, ALIAS_TABLE_VERSION};
pub use self::arrow::{build_arrow_schema, map_to_arrow_type};
pub use canonical::{CanonicalField, FIELD_COUNT};
pub use normalize::{normalize, CanonicalValues, NormalizedTable};
