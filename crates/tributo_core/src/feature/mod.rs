//! GeoJSON feature codec.
//!
//! # Responsibility
//! - Decode heterogeneous SQLite rows into flat, tagged [`Record`]s.
//! - Convert records into GeoJSON `Feature` objects.
//!
//! # Invariants
//! - Unknown value kinds are stringified; they never abort a response.
//! - Geometry and raw coordinate fields appear only in `Feature.geometry`.

mod codec;
mod record;

pub use codec::{to_feature, CollectionType, Feature, FeatureCollection, FeatureType};
pub use record::{column_kind, ColumnKind, FieldValue, Record, RowDecoder};
