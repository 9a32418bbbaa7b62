//! Property read use cases returning GeoJSON feature collections.
//!
//! # Responsibility
//! - Validate read parameters and build parameterized queries.
//! - Attach request-echo metadata to every collection.
//!
//! # Invariants
//! - Radius and nearest results carry `distancia_metros` rounded to 2 places
//!   and are ordered nearest first.
//! - Storage failures surface as errors, never as empty collections.

use super::{ServiceError, ServiceResult};
use crate::feature::{Feature, FeatureCollection};
use crate::geo::{make_point, within_radius, DEFAULT_RADIUS_M};
use crate::model::property::{PropertyFilters, PropertyId, ValidationError};
use crate::model::round2;
use crate::query::{
    build_nearest_query, build_property_query, build_radius_query, build_taxpayer_search_query,
    BuiltQuery, DISTANCE_FIELD, MAX_NEAREST_LIMIT,
};
use crate::repo::property_repo::PropertyRepository;
use log::{error, info};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

/// Result size of a nearest query when the caller does not give one.
pub const DEFAULT_NEAREST_LIMIT: u32 = 5;

/// Metadata for filtered listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListMetadata {
    pub total: usize,
    pub filtros_aplicados: PropertyFilters,
}

/// Metadata for taxpayer-name searches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMetadata {
    pub total: usize,
    pub busqueda: String,
}

/// Center of a spatial query, echoed as given.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Center {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadiusMetadata {
    pub total: usize,
    pub centro: Center,
    pub radio_metros: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestMetadata {
    pub total: usize,
    pub centro: Center,
    pub limite: u32,
}

/// Use-case service for property reads.
pub struct PropertyQueryService<R: PropertyRepository> {
    repo: R,
    default_radius_m: f64,
}

impl<R: PropertyRepository> PropertyQueryService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            default_radius_m: DEFAULT_RADIUS_M,
        }
    }

    /// Overrides the radius used when a radius search omits one.
    pub fn with_default_radius(mut self, radius_meters: f64) -> Self {
        self.default_radius_m = radius_meters;
        self
    }

    /// Lists properties matching every present filter, highest debt first.
    pub fn list_properties(
        &self,
        filters: PropertyFilters,
    ) -> ServiceResult<FeatureCollection<ListMetadata>> {
        filters.validate()?;
        let features = self.run("list_properties", &build_property_query(&filters))?;
        let total = features.len();
        Ok(FeatureCollection::new(
            features,
            ListMetadata {
                total,
                filtros_aplicados: filters,
            },
        ))
    }

    /// Lists delinquent properties only.
    pub fn list_delinquent(&self) -> ServiceResult<FeatureCollection<ListMetadata>> {
        self.list_properties(PropertyFilters::delinquent())
    }

    /// Case-insensitive substring search on the taxpayer name.
    pub fn search_by_taxpayer_name(
        &self,
        name: &str,
    ) -> ServiceResult<FeatureCollection<SearchMetadata>> {
        if name.trim().is_empty() {
            return Err(ValidationError::Blank("nombre").into());
        }
        let features = self.run(
            "search_by_taxpayer_name",
            &build_taxpayer_search_query(name.trim()),
        )?;
        let total = features.len();
        Ok(FeatureCollection::new(
            features,
            SearchMetadata {
                total,
                busqueda: name.to_string(),
            },
        ))
    }

    /// Properties within `radius_meters` of (`lat`, `lng`), nearest first.
    ///
    /// The radius defaults to the configured default (500 m) when absent.
    pub fn search_by_radius(
        &self,
        lat: f64,
        lng: f64,
        radius_meters: Option<f64>,
    ) -> ServiceResult<FeatureCollection<RadiusMetadata>> {
        let radius_meters = radius_meters.unwrap_or(self.default_radius_m);
        let center = make_point(Some(lng), Some(lat))?;
        let predicate = within_radius(center, radius_meters)?;

        let mut features = self.run("search_by_radius", &build_radius_query(&predicate))?;
        round_distances(&mut features);
        let total = features.len();
        Ok(FeatureCollection::new(
            features,
            RadiusMetadata {
                total,
                centro: Center { lat, lng },
                radio_metros: radius_meters,
            },
        ))
    }

    /// The `limit` properties closest to (`lat`, `lng`); `limit` is clamped
    /// to `1..=50` and defaults to 5.
    pub fn nearest_properties(
        &self,
        lat: f64,
        lng: f64,
        limit: Option<u32>,
    ) -> ServiceResult<FeatureCollection<NearestMetadata>> {
        let center = make_point(Some(lng), Some(lat))?;
        let limit = limit
            .unwrap_or(DEFAULT_NEAREST_LIMIT)
            .clamp(1, MAX_NEAREST_LIMIT);

        let mut features = self.run(
            "nearest_properties",
            &build_nearest_query(center.longitude(), center.latitude(), limit),
        )?;
        round_distances(&mut features);
        let total = features.len();
        Ok(FeatureCollection::new(
            features,
            NearestMetadata {
                total,
                centro: Center { lat, lng },
                limite: limit,
            },
        ))
    }

    /// Reads one property as a feature.
    pub fn get_property(&self, id: PropertyId) -> ServiceResult<Feature> {
        let started_at = Instant::now();
        let result = self
            .repo
            .get_feature(id)
            .map_err(ServiceError::during("get_property"));
        log_read(
            "get_property",
            started_at,
            &result.as_ref().map(|found| usize::from(found.is_some())),
        );
        result?.ok_or(ServiceError::NotFound(id))
    }

    fn run(&self, operation: &'static str, query: &BuiltQuery) -> ServiceResult<Vec<Feature>> {
        let started_at = Instant::now();
        let result = self
            .repo
            .query_features(query)
            .map_err(ServiceError::during(operation));
        log_read(operation, started_at, &result.as_ref().map(Vec::len));
        result
    }
}

fn round_distances(features: &mut [Feature]) {
    for feature in features {
        if let Some(distance) = feature
            .properties
            .get(DISTANCE_FIELD)
            .and_then(Value::as_f64)
        {
            feature
                .properties
                .insert(DISTANCE_FIELD.to_string(), Value::from(round2(distance)));
        }
    }
}

fn log_read(operation: &str, started_at: Instant, outcome: &Result<usize, &ServiceError>) {
    let duration_ms = started_at.elapsed().as_millis();
    match outcome {
        Ok(rows) => info!(
            "event=property_read module=service status=ok operation={} rows={} duration_ms={}",
            operation, rows, duration_ms
        ),
        Err(err) => error!(
            "event=property_read module=service status=error operation={} duration_ms={} error={}",
            operation, duration_ms, err
        ),
    }
}
