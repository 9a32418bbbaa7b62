//! Property persistence: GeoJSON reads over the read model and row-level
//! writes on `predios`.
//!
//! # Invariants
//! - Reads always decode through [`RowDecoder`] and [`to_feature`], so every
//!   read path yields the same feature shape.
//! - Raw coordinate columns never appear in feature properties.

use super::RepoResult;
use crate::feature::{to_feature, Feature, RowDecoder};
use crate::geo::GeoPoint;
use crate::model::property::{PropertyId, PropertyInput};
use crate::query::{
    build_property_by_id_query, BuiltQuery, UpdateStatement, GEOMETRY_FIELD, RAW_COORDINATE_FIELDS,
};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

/// Read contract used by property query services.
pub trait PropertyRepository {
    /// Runs a built read-model query and encodes each row as a feature.
    fn query_features(&self, query: &BuiltQuery) -> RepoResult<Vec<Feature>>;

    fn get_feature(&self, id: PropertyId) -> RepoResult<Option<Feature>> {
        Ok(self
            .query_features(&build_property_by_id_query(id))?
            .into_iter()
            .next())
    }
}

/// SQLite-backed property repository.
pub struct SqlitePropertyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePropertyRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn find_id_by_code(&self, cadastral_code: &str) -> RepoResult<Option<PropertyId>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id_predio FROM predios WHERE codigo_catastral = ?1;",
                [cadastral_code],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn cadastral_code_of(&self, id: PropertyId) -> RepoResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT codigo_catastral FROM predios WHERE id_predio = ?1;",
                [id],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Inserts the property row and returns its new id.
    pub fn insert(&self, input: &PropertyInput, location: &GeoPoint) -> RepoResult<PropertyId> {
        self.conn.execute(
            "INSERT INTO predios (
                codigo_catastral,
                longitud,
                latitud,
                sector,
                tipo_vivienda,
                numero_vivienda,
                autovaluo
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                input.cadastral_code.trim(),
                location.longitude(),
                location.latitude(),
                input.sector.trim(),
                input.housing_type.as_str(),
                input.house_number.as_str(),
                input.assessed_value,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Applies a partial update. Returns the number of rows changed.
    pub fn apply_update(&self, id: PropertyId, update: &UpdateStatement) -> RepoResult<usize> {
        let Some(built) = update.build("id_predio", id) else {
            return Ok(0);
        };
        Ok(self
            .conn
            .execute(&built.sql, params_from_iter(built.params))?)
    }

    /// Deletes the property; its tax record goes with it by cascade.
    pub fn delete(&self, id: PropertyId) -> RepoResult<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM predios WHERE id_predio = ?1;", [id])?)
    }
}

impl PropertyRepository for SqlitePropertyRepository<'_> {
    fn query_features(&self, query: &BuiltQuery) -> RepoResult<Vec<Feature>> {
        let mut stmt = self.conn.prepare(&query.sql)?;
        let decoder = RowDecoder::for_statement(&stmt);
        let mut rows = stmt.query(params_from_iter(query.params.iter()))?;
        let mut features = Vec::new();

        while let Some(row) = rows.next()? {
            let record = decoder.decode(row)?;
            features.push(to_feature(record, GEOMETRY_FIELD, &RAW_COORDINATE_FIELDS));
        }

        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::{PropertyRepository, SqlitePropertyRepository};
    use crate::db::open_db_in_memory;
    use crate::geo::make_point;
    use crate::model::property::PropertyInput;
    use crate::query::UpdateStatement;
    use serde_json::json;

    #[test]
    fn inserted_property_reads_back_as_feature_without_tax_record() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqlitePropertyRepository::new(&conn);
        let input = PropertyInput::new("HOG0001", "Ana Quispe", -70.0125, -15.8402);
        let point = make_point(input.longitude, input.latitude).unwrap();

        let id = repo.insert(&input, &point).unwrap();
        assert_eq!(repo.find_id_by_code("HOG0001").unwrap(), Some(id));
        assert_eq!(repo.cadastral_code_of(id).unwrap().as_deref(), Some("HOG0001"));

        let feature = repo.get_feature(id).unwrap().unwrap();
        let geometry = serde_json::to_value(&feature.geometry).unwrap();
        assert_eq!(geometry, json!({"type": "Point", "coordinates": [-70.0125, -15.8402]}));
        assert!(feature.property("longitud").is_none());
        assert!(feature.property("geom_json").is_none());
        assert_eq!(feature.property("estado_pago"), Some(&json!(null)));
        assert_eq!(feature.property("sector"), Some(&json!("Jayllihuaya")));
    }

    #[test]
    fn empty_update_changes_nothing_and_delete_reports_rows() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqlitePropertyRepository::new(&conn);
        let input = PropertyInput::new("HOG0002", "Ana Quispe", -70.0, -15.8);
        let id = repo
            .insert(&input, &make_point(input.longitude, input.latitude).unwrap())
            .unwrap();

        let update = UpdateStatement::new("predios");
        assert_eq!(repo.apply_update(id, &update).unwrap(), 0);
        assert_eq!(repo.delete(id).unwrap(), 1);
        assert_eq!(repo.delete(id).unwrap(), 0);
        assert!(repo.get_feature(id).unwrap().is_none());
    }
}
