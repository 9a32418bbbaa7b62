//! Parameterized SQL construction for property reads and partial updates.
//!
//! # Responsibility
//! - Turn optional filters into a SQL string plus positional bind values.
//! - Keep every user-supplied value out of the SQL text.
//!
//! # Invariants
//! - Column names come only from `&'static str` constants in this crate.
//! - Placeholders are emitted in the same order as `BuiltQuery::params`.
//! - Absent filters emit no predicate.

mod builder;
mod property;

pub use builder::{Assignment, BuiltQuery, Clause, SelectQuery, UpdateStatement};
pub use property::{
    build_nearest_query, build_property_by_id_query, build_property_query, build_radius_query,
    build_taxpayer_search_query, DISTANCE_FIELD, GEOMETRY_FIELD, MAX_NEAREST_LIMIT,
    PROPERTY_VIEW, RAW_COORDINATE_FIELDS,
};
