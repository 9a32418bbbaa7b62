//! Use-case API consumed by request handlers and the CLI.
//!
//! # Responsibility
//! - Open one connection per call and release it on every exit path.
//! - Wrap core results in stable, serializable envelopes.
//!
//! # Invariants
//! - No connection or transaction outlives a call.
//! - Calls never panic; failures come back as [`ApiError`].
//! - `health` reports reachability only and never leaks error detail.

use crate::error::{ApiError, ApiResult};
use log::{error, info};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use tributo_core::db::{open_db, ping_db};
use tributo_core::{
    core_version, Feature, FeatureCollection, ListMetadata, NearestMetadata, PropertyFilters,
    PropertyId, PropertyInput, PropertyPatch, PropertyQueryService, PropertyWriteService,
    RadiusMetadata, ReportService, SearchMetadata, SectorReport, SqlitePropertyRepository,
    SqliteReportRepository, StatisticsReport, StoreConfig,
};

const SERVICE_NAME: &str = "API Tributaria Municipal - Jayllihuaya";

/// Service descriptor returned by [`Api::root`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootResponse {
    pub mensaje: String,
    pub version: String,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorsResponse {
    pub sectores: Vec<SectorReport>,
}

/// Envelope of a successful create or update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteResponse {
    pub success: bool,
    pub message: String,
    pub predio: Feature,
}

/// Envelope of a successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
    pub id_predio: PropertyId,
    pub codigo_catastral: String,
}

/// Entry point bound to a resolved configuration.
#[derive(Debug, Clone)]
pub struct Api {
    config: StoreConfig,
}

impl Api {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn root(&self) -> RootResponse {
        RootResponse {
            mensaje: SERVICE_NAME.to_string(),
            version: core_version().to_string(),
            endpoints: BTreeMap::from([
                ("predios", "/api/predios"),
                ("morosos", "/api/predios/morosos"),
                ("buscar", "/api/buscar?nombre={nombre}"),
                ("radio", "/api/predios/radio?lat={lat}&lng={lng}&radius={metros}"),
                ("cercanos", "/api/predios/cercanos?lat={lat}&lng={lng}&limite={n}"),
                ("predio", "/api/predios/{id_predio}"),
                ("estadisticas", "/api/estadisticas"),
                ("sectores", "/api/sectores"),
            ]),
        }
    }

    /// Liveness: opens a fresh connection and runs `SELECT 1`.
    pub fn health(&self) -> HealthResponse {
        let reachable = open_db(&self.config.db_path).and_then(|conn| ping_db(&conn));
        match reachable {
            Ok(()) => HealthResponse {
                status: "healthy",
                database: "connected",
            },
            Err(err) => {
                error!(
                    "event=health_check module=api status=error error={}",
                    err
                );
                HealthResponse {
                    status: "unhealthy",
                    database: "disconnected",
                }
            }
        }
    }

    pub fn list_properties(
        &self,
        filters: PropertyFilters,
    ) -> ApiResult<FeatureCollection<ListMetadata>> {
        let conn = self.connect("list_properties")?;
        Ok(self.query_service(&conn).list_properties(filters)?)
    }

    pub fn list_delinquent(&self) -> ApiResult<FeatureCollection<ListMetadata>> {
        let conn = self.connect("list_delinquent")?;
        Ok(self.query_service(&conn).list_delinquent()?)
    }

    pub fn search_by_taxpayer_name(
        &self,
        name: &str,
    ) -> ApiResult<FeatureCollection<SearchMetadata>> {
        let conn = self.connect("search_by_taxpayer_name")?;
        Ok(self.query_service(&conn).search_by_taxpayer_name(name)?)
    }

    pub fn search_by_radius(
        &self,
        lat: f64,
        lng: f64,
        radius_meters: Option<f64>,
    ) -> ApiResult<FeatureCollection<RadiusMetadata>> {
        let conn = self.connect("search_by_radius")?;
        Ok(self
            .query_service(&conn)
            .search_by_radius(lat, lng, radius_meters)?)
    }

    pub fn nearest_properties(
        &self,
        lat: f64,
        lng: f64,
        limit: Option<u32>,
    ) -> ApiResult<FeatureCollection<NearestMetadata>> {
        let conn = self.connect("nearest_properties")?;
        Ok(self.query_service(&conn).nearest_properties(lat, lng, limit)?)
    }

    pub fn get_property(&self, id: PropertyId) -> ApiResult<Feature> {
        let conn = self.connect("get_property")?;
        Ok(self.query_service(&conn).get_property(id)?)
    }

    pub fn statistics(&self) -> ApiResult<StatisticsReport> {
        let conn = self.connect("statistics")?;
        Ok(ReportService::new(SqliteReportRepository::new(&conn)).statistics()?)
    }

    pub fn sectors(&self) -> ApiResult<SectorsResponse> {
        let conn = self.connect("sectors")?;
        let sectores = ReportService::new(SqliteReportRepository::new(&conn)).sectors()?;
        Ok(SectorsResponse { sectores })
    }

    pub fn create_property(&self, input: &PropertyInput) -> ApiResult<WriteResponse> {
        let mut conn = self.connect("create_property")?;
        let predio = PropertyWriteService::new(&mut conn).create_property(input)?;
        Ok(WriteResponse {
            success: true,
            message: "Predio creado exitosamente".to_string(),
            predio,
        })
    }

    pub fn update_property(
        &self,
        id: PropertyId,
        patch: &PropertyPatch,
    ) -> ApiResult<WriteResponse> {
        let mut conn = self.connect("update_property")?;
        let predio = PropertyWriteService::new(&mut conn).update_property(id, patch)?;
        Ok(WriteResponse {
            success: true,
            message: "Predio actualizado exitosamente".to_string(),
            predio,
        })
    }

    pub fn delete_property(&self, id: PropertyId) -> ApiResult<DeleteResponse> {
        let mut conn = self.connect("delete_property")?;
        let deleted = PropertyWriteService::new(&mut conn).delete_property(id)?;
        Ok(DeleteResponse {
            success: true,
            message: format!("Predio {} eliminado exitosamente", deleted.cadastral_code),
            id_predio: deleted.id,
            codigo_catastral: deleted.cadastral_code,
        })
    }

    fn connect(&self, operation: &str) -> ApiResult<Connection> {
        open_db(&self.config.db_path).map_err(|err| {
            error!(
                "event=api_call module=api status=error operation={} error_code=db_unavailable error={}",
                operation, err
            );
            ApiError::unavailable(operation, &err)
        })
    }

    fn query_service<'conn>(
        &self,
        conn: &'conn Connection,
    ) -> PropertyQueryService<SqlitePropertyRepository<'conn>> {
        info!("event=api_call module=api status=start operation=property_query");
        PropertyQueryService::new(SqlitePropertyRepository::new(conn))
            .with_default_radius(self.config.default_radius_m)
    }
}

#[cfg(test)]
mod tests {
    use super::Api;
    use crate::error::ErrorKind;
    use serde_json::{json, Value};
    use tributo_core::{PropertyFilters, PropertyInput, PropertyPatch, StoreConfig};

    fn api_in(dir: &tempfile::TempDir) -> Api {
        Api::new(StoreConfig::default().with_db_path(dir.path().join("tributo.sqlite3")))
    }

    fn created_id(api: &Api, code: &str, debt: f64) -> i64 {
        let mut input = PropertyInput::new(code, "Ana Quispe", -70.0125, -15.8402);
        input.tax_amount = debt;
        let response = api.create_property(&input).unwrap();
        assert!(response.success);
        response
            .predio
            .property("id_predio")
            .and_then(Value::as_i64)
            .unwrap()
    }

    #[test]
    fn root_and_health_describe_the_service() {
        let dir = tempfile::tempdir().unwrap();
        let api = api_in(&dir);

        let root = serde_json::to_value(api.root()).unwrap();
        assert_eq!(root["mensaje"], "API Tributaria Municipal - Jayllihuaya");
        assert_eq!(root["endpoints"]["estadisticas"], "/api/estadisticas");

        assert_eq!(
            serde_json::to_value(api.health()).unwrap(),
            json!({"status": "healthy", "database": "connected"})
        );
    }

    #[test]
    fn health_reports_disconnected_without_detail() {
        let dir = tempfile::tempdir().unwrap();
        let api = Api::new(
            StoreConfig::default().with_db_path(dir.path().join("missing").join("db.sqlite3")),
        );

        let health = api.health();
        assert!(!health.is_healthy());
        assert_eq!(health.database, "disconnected");

        let err = api.list_delinquent().unwrap_err();
        assert_eq!(err.error, ErrorKind::StorageUnavailable);
        assert_eq!(err.status, 503);
    }

    #[test]
    fn write_envelopes_and_error_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let api = api_in(&dir);
        let id = created_id(&api, "HOG0001", 150.0);

        let duplicate = api
            .create_property(&PropertyInput::new("HOG0001", "Rosa Mamani", -70.0, -15.8))
            .unwrap_err();
        assert_eq!(duplicate.status, 409);

        let updated = api
            .update_property(
                id,
                &PropertyPatch {
                    tax_paid: Some(true),
                    ..PropertyPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.message, "Predio actualizado exitosamente");
        assert_eq!(updated.predio.properties["estado_pago"], "AL_DIA");

        let deleted = serde_json::to_value(api.delete_property(id).unwrap()).unwrap();
        assert_eq!(
            deleted,
            json!({
                "success": true,
                "message": "Predio HOG0001 eliminado exitosamente",
                "id_predio": id,
                "codigo_catastral": "HOG0001"
            })
        );

        let missing = api.delete_property(id).unwrap_err();
        assert_eq!(missing.error, ErrorKind::NotFound);
        assert_eq!(missing.status, 404);
    }

    #[test]
    fn reads_go_through_fresh_connections() {
        let dir = tempfile::tempdir().unwrap();
        let api = api_in(&dir);
        created_id(&api, "HOG0001", 150.0);
        created_id(&api, "HOG0002", 0.0);

        let delinquent = api.list_delinquent().unwrap();
        assert_eq!(delinquent.metadata.total, 1);

        let all = api.list_properties(PropertyFilters::default()).unwrap();
        assert_eq!(all.len(), 2);

        let stats = serde_json::to_value(api.statistics().unwrap()).unwrap();
        assert_eq!(stats["indicadores"]["morosos"], 1);

        let sectors = serde_json::to_value(api.sectors().unwrap()).unwrap();
        assert_eq!(sectors["sectores"][0]["sector"], "Jayllihuaya");
        assert_eq!(sectors["sectores"][0]["total_predios"], 2);

        let radius = api.search_by_radius(-15.8402, -70.0125, None).unwrap();
        assert_eq!(radius.len(), 2);
        assert_eq!(radius.metadata.radio_metros, 500.0);

        let invalid = api.search_by_radius(-15.8402, -70.0125, Some(-3.0)).unwrap_err();
        assert_eq!(invalid.status, 400);
    }
}
