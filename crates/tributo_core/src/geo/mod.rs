//! Geometry adapter: point construction and geodetic proximity.
//!
//! # Responsibility
//! - Build WGS 84 points from longitude/latitude input.
//! - Compute great-circle distances in meters.
//! - Describe radius predicates (and their index-friendly bounding boxes)
//!   that the query builder renders into SQL.
//!
//! # Invariants
//! - Coordinates are always ordered longitude, then latitude, at every
//!   boundary (struct fields, GeoJSON, SQL function arguments).
//! - Distances use a spherical Earth model, never planar degrees.

mod point;
mod radius;

pub use point::{
    distance_meters, great_circle_meters, make_point, Axis, GeoPoint, Geometry, GeometryError,
    EARTH_MEAN_RADIUS_M, SRID_WGS84,
};
pub use radius::{within_radius, BoundingBox, RadiusPredicate, DEFAULT_RADIUS_M};
