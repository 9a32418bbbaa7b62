//! WGS 84 points, GeoJSON point geometry and haversine distance.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// EPSG code of the reference system every stored coordinate uses.
pub const SRID_WGS84: i32 = 4326;

/// IUGG mean Earth radius in meters.
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// Coordinate axis, used to report which half of a pair was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Longitude,
    Latitude,
}

impl Axis {
    /// Wire name of the axis.
    pub fn label(self) -> &'static str {
        match self {
            Self::Longitude => "longitud",
            Self::Latitude => "latitud",
        }
    }

    fn limit(self) -> f64 {
        match self {
            Self::Longitude => 180.0,
            Self::Latitude => 90.0,
        }
    }
}

/// Geometry construction error.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Coordinate is absent, non-finite or outside the WGS 84 range.
    InvalidCoordinate { axis: Axis, value: Option<f64> },
    /// Radius is negative or non-finite.
    InvalidRadius(f64),
}

impl Display for GeometryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCoordinate { axis, value: None } => {
                write!(f, "invalid coordinate: {} is required", axis.label())
            }
            Self::InvalidCoordinate {
                axis,
                value: Some(value),
            } => write!(
                f,
                "invalid coordinate: {} `{value}` must be a finite number within [-{limit}, {limit}]",
                axis.label(),
                limit = axis.limit()
            ),
            Self::InvalidRadius(value) => write!(
                f,
                "invalid radius `{value}`: must be a finite, non-negative number of meters"
            ),
        }
    }
}

impl Error for GeometryError {}

/// A validated WGS 84 point.
///
/// Construct through [`make_point`]; fields are private so an unchecked
/// pair can never reach storage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    longitude: f64,
    latitude: f64,
}

impl GeoPoint {
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// GeoJSON representation (`[longitude, latitude]`).
    pub fn to_geometry(&self) -> Geometry {
        Geometry::Point {
            coordinates: [self.longitude, self.latitude],
        }
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        great_circle_meters(
            self.longitude,
            self.latitude,
            other.longitude,
            other.latitude,
        )
    }
}

/// GeoJSON geometry object.
///
/// Only points are stored by this system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
}

/// Builds a point from longitude and latitude, in that order.
///
/// # Errors
/// - `InvalidCoordinate` when either value is absent, non-finite or out of
///   range (`|longitude| <= 180`, `|latitude| <= 90`).
pub fn make_point(longitude: Option<f64>, latitude: Option<f64>) -> Result<GeoPoint, GeometryError> {
    let longitude = check_axis(Axis::Longitude, longitude)?;
    let latitude = check_axis(Axis::Latitude, latitude)?;
    Ok(GeoPoint {
        longitude,
        latitude,
    })
}

/// Distance between two points in meters.
pub fn distance_meters(point: &GeoPoint, center: &GeoPoint) -> f64 {
    point.distance_meters(center)
}

/// Haversine distance in meters between `(lon1, lat1)` and `(lon2, lat2)`.
pub fn great_circle_meters(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1 for antipodal points.
    2.0 * EARTH_MEAN_RADIUS_M * a.sqrt().min(1.0).asin()
}

fn check_axis(axis: Axis, value: Option<f64>) -> Result<f64, GeometryError> {
    match value {
        Some(value) if value.is_finite() && value.abs() <= axis.limit() => Ok(value),
        other => Err(GeometryError::InvalidCoordinate {
            axis,
            value: other,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{great_circle_meters, make_point, Axis, Geometry, GeometryError};

    #[test]
    fn make_point_keeps_longitude_first() {
        let point = make_point(Some(-70.0125), Some(-15.8402)).unwrap();
        assert_eq!(point.longitude(), -70.0125);
        assert_eq!(point.latitude(), -15.8402);
        assert_eq!(
            point.to_geometry(),
            Geometry::Point {
                coordinates: [-70.0125, -15.8402]
            }
        );
    }

    #[test]
    fn make_point_rejects_missing_and_non_finite_values() {
        let missing = make_point(None, Some(1.0)).unwrap_err();
        assert_eq!(
            missing,
            GeometryError::InvalidCoordinate {
                axis: Axis::Longitude,
                value: None
            }
        );

        let nan = make_point(Some(1.0), Some(f64::NAN)).unwrap_err();
        assert!(matches!(
            nan,
            GeometryError::InvalidCoordinate {
                axis: Axis::Latitude,
                ..
            }
        ));
        assert!(make_point(Some(f64::INFINITY), Some(1.0)).is_err());
    }

    #[test]
    fn make_point_rejects_transposed_pair_outside_latitude_range() {
        // A longitude beyond 90 degrees cannot pass as a latitude.
        assert!(make_point(Some(-120.0), Some(-15.8402)).is_ok());
        let err = make_point(Some(-15.8402), Some(-120.0)).unwrap_err();
        assert!(err.to_string().contains("latitud"));
    }

    #[test]
    fn distance_is_zero_for_same_point_and_symmetric() {
        let a = make_point(Some(-70.0125), Some(-15.8402)).unwrap();
        let b = make_point(Some(-70.0200), Some(-15.8450)).unwrap();
        assert_eq!(a.distance_meters(&a), 0.0);
        assert!((a.distance_meters(&b) - b.distance_meters(&a)).abs() < 1e-9);
    }

    #[test]
    fn longitude_degree_shrinks_with_latitude() {
        let at_equator = great_circle_meters(0.0, 0.0, 1.0, 0.0);
        let at_sixty = great_circle_meters(0.0, 60.0, 1.0, 60.0);
        assert!((at_equator - 111_195.0).abs() < 5.0);
        // Planar degree math would report these as equal.
        assert!((at_sixty - at_equator / 2.0).abs() < 100.0, "got {at_sixty}");
    }

    #[test]
    fn swapping_axes_changes_distance_for_asymmetric_points() {
        let straight = great_circle_meters(-70.0, -15.0, -70.0, -15.01);
        let swapped = great_circle_meters(-15.0, -70.0, -15.01, -70.0);
        assert!((straight - swapped).abs() > 100.0);
    }
}
