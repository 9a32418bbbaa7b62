//! Property read queries over the `predios_completo` view.

use super::builder::{BuiltQuery, Clause, SelectQuery};
use crate::geo::RadiusPredicate;
use crate::model::property::{PropertyFilters, PropertyId};
use rusqlite::types::Value;

/// Denormalized read model: property, taxpayer and tax record per row.
pub const PROPERTY_VIEW: &str = "predios_completo";

/// View column holding GeoJSON geometry text.
pub const GEOMETRY_FIELD: &str = "geom_json";

/// Raw coordinate columns dropped from feature properties.
pub const RAW_COORDINATE_FIELDS: [&str; 2] = ["longitud", "latitud"];

/// Computed column added by radius and nearest queries.
pub const DISTANCE_FIELD: &str = "distancia_metros";

/// Upper bound for nearest-neighbour result size.
pub const MAX_NEAREST_LIMIT: u32 = 50;

const DISTANCE_COLUMN: &str = "distance_meters(longitud, latitud, ?, ?) AS distancia_metros";

/// Filtered listing ordered by total debt descending, then id.
///
/// Properties without a tax record count as zero debt.
pub fn build_property_query(filters: &PropertyFilters) -> BuiltQuery {
    let sector = filters
        .sector
        .as_deref()
        .map(str::trim)
        .filter(|sector| !sector.is_empty());

    SelectQuery::from(PROPERTY_VIEW)
        .filter_opt(filters.status.map(|status| Clause::Equals {
            column: "estado_pago",
            value: Value::Text(status.as_db().to_string()),
        }))
        .filter_opt(filters.min_debt.map(|min| Clause::AtLeast {
            column: "deuda_total",
            value: Value::Real(min),
        }))
        .filter_opt(filters.max_debt.map(|max| Clause::AtMost {
            column: "deuda_total",
            value: Value::Real(max),
        }))
        .filter_opt(sector.map(|sector| Clause::ContainsInsensitive {
            column: "sector",
            needle: sector.to_string(),
        }))
        .order_by("COALESCE(deuda_total, 0) DESC")
        .order_by("id_predio ASC")
        .build()
}

/// Case-insensitive substring search on the taxpayer name, ordered by name.
pub fn build_taxpayer_search_query(name: &str) -> BuiltQuery {
    SelectQuery::from(PROPERTY_VIEW)
        .filter(Clause::ContainsInsensitive {
            column: "contribuyente_nombre",
            needle: name.to_string(),
        })
        .order_by("contribuyente_nombre COLLATE NOCASE ASC")
        .order_by("id_predio ASC")
        .build()
}

/// Properties within the predicate radius, nearest first.
pub fn build_radius_query(predicate: &RadiusPredicate) -> BuiltQuery {
    let center = predicate.center();
    SelectQuery::from(PROPERTY_VIEW)
        .column(
            DISTANCE_COLUMN,
            vec![Value::Real(center.longitude()), Value::Real(center.latitude())],
        )
        .filter(Clause::WithinRadius {
            longitude_column: "longitud",
            latitude_column: "latitud",
            predicate: *predicate,
        })
        .order_by("distancia_metros ASC")
        .order_by("id_predio ASC")
        .build()
}

/// The `limit` properties closest to `center`, nearest first.
pub fn build_nearest_query(center_longitude: f64, center_latitude: f64, limit: u32) -> BuiltQuery {
    SelectQuery::from(PROPERTY_VIEW)
        .column(
            DISTANCE_COLUMN,
            vec![Value::Real(center_longitude), Value::Real(center_latitude)],
        )
        .order_by("distancia_metros ASC")
        .order_by("id_predio ASC")
        .limit(limit.clamp(1, MAX_NEAREST_LIMIT))
        .build()
}

pub fn build_property_by_id_query(id: PropertyId) -> BuiltQuery {
    SelectQuery::from(PROPERTY_VIEW)
        .filter(Clause::Equals {
            column: "id_predio",
            value: Value::Integer(id),
        })
        .build()
}
