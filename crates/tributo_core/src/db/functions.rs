//! Scalar SQL functions that make a plain SQLite connection spatially capable.
//!
//! # Responsibility
//! - `make_point(longitude, latitude)`: GeoJSON Point text, longitude first.
//! - `distance_meters(lon1, lat1, lon2, lat2)`: great-circle distance in meters.
//! - `fold_case(text)`: Unicode lowercase for case-insensitive matching.
//!
//! # Invariants
//! - All functions are deterministic and NULL-propagating.
//! - Argument order is always longitude before latitude.

use crate::geo::{great_circle_meters, make_point};
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// Registers every core SQL function on the given connection.
pub fn register_sql_functions(conn: &Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_scalar_function("make_point", 2, flags, |ctx| {
        let longitude = ctx.get::<Option<f64>>(0)?;
        let latitude = ctx.get::<Option<f64>>(1)?;
        let Ok(point) = make_point(longitude, latitude) else {
            return Ok(None);
        };
        serde_json::to_string(&point.to_geometry())
            .map(Some)
            .map_err(|err| rusqlite::Error::UserFunctionError(Box::new(err)))
    })?;

    conn.create_scalar_function("distance_meters", 4, flags, |ctx| {
        let from_longitude = ctx.get::<Option<f64>>(0)?;
        let from_latitude = ctx.get::<Option<f64>>(1)?;
        let to_longitude = ctx.get::<Option<f64>>(2)?;
        let to_latitude = ctx.get::<Option<f64>>(3)?;
        Ok(
            match (from_longitude, from_latitude, to_longitude, to_latitude) {
                (Some(lon1), Some(lat1), Some(lon2), Some(lat2)) => {
                    Some(great_circle_meters(lon1, lat1, lon2, lat2))
                }
                _ => None,
            },
        )
    })?;

    conn.create_scalar_function("fold_case", 1, flags, |ctx| {
        Ok(ctx
            .get::<Option<String>>(0)?
            .map(|value| value.to_lowercase()))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::register_sql_functions;
    use rusqlite::Connection;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        register_sql_functions(&conn).unwrap();
        conn
    }

    #[test]
    fn make_point_emits_longitude_first() {
        let text: String = conn()
            .query_row("SELECT make_point(-70.0125, -15.8402);", [], |row| row.get(0))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "Point");
        assert_eq!(value["coordinates"][0], -70.0125);
        assert_eq!(value["coordinates"][1], -15.8402);
    }

    #[test]
    fn make_point_is_null_for_missing_or_out_of_range_input() {
        let conn = conn();
        let missing: Option<String> = conn
            .query_row("SELECT make_point(NULL, 10.0);", [], |row| row.get(0))
            .unwrap();
        assert!(missing.is_none());

        let out_of_range: Option<String> = conn
            .query_row("SELECT make_point(10.0, 95.0);", [], |row| row.get(0))
            .unwrap();
        assert!(out_of_range.is_none());
    }

    #[test]
    fn distance_meters_matches_one_degree_of_latitude() {
        let meters: f64 = conn()
            .query_row("SELECT distance_meters(0.0, 0.0, 0.0, 1.0);", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert!((meters - 111_195.0).abs() < 5.0, "got {meters}");
    }

    #[test]
    fn fold_case_lowercases_non_ascii() {
        let folded: String = conn()
            .query_row("SELECT fold_case('ÑUÑOA Sector');", [], |row| row.get(0))
            .unwrap();
        assert_eq!(folded, "ñuñoa sector");
    }
}
