//! Radius predicates over WGS 84 points.

use super::point::{GeoPoint, GeometryError, EARTH_MEAN_RADIUS_M};
use std::f64::consts::FRAC_PI_2;

/// Radius used by proximity search when the caller does not supply one.
pub const DEFAULT_RADIUS_M: f64 = 500.0;

// Absorbs float error at the box edges; the exact distance test still runs.
const BBOX_PADDING_DEG: f64 = 1e-9;

/// "Within `radius_meters` of `center`" test.
///
/// Rendered into SQL by the query builder; [`RadiusPredicate::contains`]
/// evaluates the same rule in memory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusPredicate {
    center: GeoPoint,
    radius_meters: f64,
}

/// Axis-aligned degree box that contains every point of a radius predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_longitude: f64,
    pub max_longitude: f64,
    pub min_latitude: f64,
    pub max_latitude: f64,
}

/// Builds a radius predicate around `center`.
///
/// # Errors
/// - `InvalidRadius` for negative or non-finite radii.
pub fn within_radius(center: GeoPoint, radius_meters: f64) -> Result<RadiusPredicate, GeometryError> {
    if !radius_meters.is_finite() || radius_meters < 0.0 {
        return Err(GeometryError::InvalidRadius(radius_meters));
    }
    Ok(RadiusPredicate {
        center,
        radius_meters,
    })
}

impl RadiusPredicate {
    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    /// Whether `point` lies within the radius (boundary inclusive).
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.center.distance_meters(point) <= self.radius_meters
    }

    /// Degree box usable as an index prefilter.
    ///
    /// Returns `None` when the circle touches a pole or crosses the
    /// antimeridian; callers then rely on the distance test alone.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let angular = self.radius_meters / EARTH_MEAN_RADIUS_M;
        if angular >= FRAC_PI_2 {
            return None;
        }

        let latitude = self.center.latitude();
        let longitude = self.center.longitude();
        let delta_lat = angular.to_degrees();
        let min_latitude = latitude - delta_lat;
        let max_latitude = latitude + delta_lat;
        if min_latitude <= -90.0 || max_latitude >= 90.0 {
            return None;
        }

        let ratio = angular.sin() / latitude.to_radians().cos();
        if ratio >= 1.0 {
            return None;
        }
        let delta_lng = ratio.asin().to_degrees();
        let min_longitude = longitude - delta_lng;
        let max_longitude = longitude + delta_lng;
        if min_longitude < -180.0 || max_longitude > 180.0 {
            return None;
        }

        Some(BoundingBox {
            min_longitude: min_longitude - BBOX_PADDING_DEG,
            max_longitude: max_longitude + BBOX_PADDING_DEG,
            min_latitude: min_latitude - BBOX_PADDING_DEG,
            max_latitude: max_latitude + BBOX_PADDING_DEG,
        })
    }
}
