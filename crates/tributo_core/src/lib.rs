//! Core domain logic for the municipal property tax backend.
//! This crate owns storage, spatial queries, GeoJSON encoding and the
//! transactional write rules.

pub mod config;
pub mod db;
pub mod feature;
pub mod geo;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use config::{ConfigError, StoreConfig};
pub use feature::{Feature, FeatureCollection};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::property::{
    DeletedProperty, PaymentStatus, PropertyFilters, PropertyId, PropertyInput, PropertyPatch,
    ValidationError,
};
pub use model::report::{SectorReport, StatisticsReport};
pub use repo::property_repo::{PropertyRepository, SqlitePropertyRepository};
pub use repo::report_repo::{ReportRepository, SqliteReportRepository};
pub use repo::{RepoError, RepoResult};
pub use service::property_service::{
    Center, ListMetadata, NearestMetadata, PropertyQueryService, RadiusMetadata, SearchMetadata,
};
pub use service::report_service::ReportService;
pub use service::write_service::PropertyWriteService;
pub use service::{ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
