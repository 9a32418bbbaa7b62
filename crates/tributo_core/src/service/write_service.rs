//! Transactional create/update/delete of properties.
//!
//! # Responsibility
//! - Run each write as Validate -> Resolve dependencies -> Mutate -> Commit.
//! - Read the written property back inside the same transaction.
//!
//! # Invariants
//! - Every write runs in one `IMMEDIATE` transaction; any failure drops the
//!   transaction, which rolls back every statement of the request.
//! - Input validation happens before the transaction starts.
//! - Existence and duplicate checks run inside the transaction. The
//!   `UNIQUE` constraint on `codigo_catastral` backs the duplicate check.
//! - Taxpayers are never deleted.

use super::{ServiceError, ServiceResult};
use crate::feature::Feature;
use crate::model::property::{
    DeletedProperty, PropertyId, PropertyInput, PropertyPatch,
};
use crate::query::UpdateStatement;
use crate::repo::property_repo::{PropertyRepository, SqlitePropertyRepository};
use crate::repo::tax_record_repo::SqliteTaxRecordRepository;
use crate::repo::taxpayer_repo::SqliteTaxpayerRepository;
use crate::repo::{RepoError, RepoResult};
use log::{error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Instant;

/// Write coordinator bound to one request-scoped connection.
pub struct PropertyWriteService<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> PropertyWriteService<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    /// Creates a property, its tax record and (when new) its taxpayer.
    ///
    /// # Errors
    /// - `Validation` for missing coordinates or malformed fields.
    /// - `DuplicateKey` when the cadastral code already exists.
    /// - `Storage`/`StorageUnavailable` for any failure after validation;
    ///   nothing is left behind.
    pub fn create_property(&mut self, input: &PropertyInput) -> ServiceResult<Feature> {
        const OPERATION: &str = "create_property";
        let location = input.validate()?;
        let started_at = Instant::now();

        let result = self.in_transaction(OPERATION, |tx| {
            let properties = SqlitePropertyRepository::new(tx);
            let cadastral_code = input.cadastral_code.trim();
            if properties
                .find_id_by_code(cadastral_code)
                .map_err(ServiceError::during(OPERATION))?
                .is_some()
            {
                return Err(duplicate_code(cadastral_code));
            }

            let taxpayer = SqliteTaxpayerRepository::new(tx)
                .find_or_create(
                    input.taxpayer_name.trim(),
                    input.taxpayer_national_id.as_deref(),
                    input.taxpayer_phone.as_deref(),
                )
                .map_err(ServiceError::during(OPERATION))?;

            let id = properties
                .insert(input, &location)
                .map_err(|err| match err {
                    RepoError::UniqueViolation(_) => duplicate_code(cadastral_code),
                    err => ServiceError::storage(OPERATION, err),
                })?;
            SqliteTaxRecordRepository::new(tx)
                .insert(id, taxpayer.id, input)
                .map_err(ServiceError::during(OPERATION))?;

            info!(
                "event=taxpayer_resolve module=service status=ok taxpayer_id={} created={}",
                taxpayer.id, taxpayer.created
            );
            read_back(&properties, id).map_err(ServiceError::during(OPERATION))
        });

        log_write(OPERATION, None, started_at, &result);
        result
    }

    /// Applies the fields present in `patch` to property `id`.
    ///
    /// An empty patch succeeds without changing any column.
    ///
    /// # Errors
    /// - `Validation` for a lone coordinate or malformed fields.
    /// - `NotFound` when the property does not exist.
    /// - `DuplicateKey` when the new cadastral code belongs to another
    ///   property.
    pub fn update_property(&mut self, id: PropertyId, patch: &PropertyPatch) -> ServiceResult<Feature> {
        const OPERATION: &str = "update_property";
        let location = patch.validate()?;
        let started_at = Instant::now();

        let result = self.in_transaction(OPERATION, |tx| {
            let properties = SqlitePropertyRepository::new(tx);
            if properties
                .cadastral_code_of(id)
                .map_err(ServiceError::during(OPERATION))?
                .is_none()
            {
                return Err(ServiceError::NotFound(id));
            }

            let new_code = patch.cadastral_code.as_deref().map(str::trim);
            if let Some(code) = new_code {
                let owner = properties
                    .find_id_by_code(code)
                    .map_err(ServiceError::during(OPERATION))?;
                if matches!(owner, Some(owner) if owner != id) {
                    return Err(duplicate_code(code));
                }
            }

            let mut record_update = UpdateStatement::new("tributos");
            record_update.set_opt("monto_impuesto", patch.tax_amount);
            record_update.set_opt("pago_impuesto", patch.tax_paid);
            record_update.set_opt("monto_arbitrios", patch.fee_amount);
            record_update.set_opt("pago_arbitrios", patch.fee_paid);
            record_update.set_opt("ingreso_familiar", patch.household_income);
            record_update.set_opt("cantidad_personas", patch.household_size);
            record_update.set_opt("nivel_educativo_jefe", patch.education_level.clone());
            record_update.set_opt("servicios_basicos", patch.basic_services.clone());
            let record_changed = SqliteTaxRecordRepository::new(tx)
                .apply_update(id, &record_update)
                .map_err(ServiceError::during(OPERATION))?
                > 0;

            let mut property_update = UpdateStatement::new("predios").touch("updated_at");
            property_update.set_opt("codigo_catastral", new_code.map(str::to_string));
            property_update.set_opt("sector", patch.sector.as_deref().map(|s| s.trim().to_string()));
            property_update.set_opt("tipo_vivienda", patch.housing_type.clone());
            property_update.set_opt("autovaluo", patch.assessed_value);
            property_update.set_opt("numero_vivienda", patch.house_number.clone());
            if let Some(location) = location {
                property_update.set("longitud", location.longitude());
                property_update.set("latitud", location.latitude());
            }
            if record_changed {
                property_update.force_touch();
            }
            properties
                .apply_update(id, &property_update)
                .map_err(|err| match err {
                    RepoError::UniqueViolation(_) => {
                        duplicate_code(new_code.unwrap_or_default())
                    }
                    err => ServiceError::storage(OPERATION, err),
                })?;

            if let Some(name) = patch.taxpayer_name.as_deref() {
                rename_taxpayer(tx, id, name.trim()).map_err(ServiceError::during(OPERATION))?;
            }

            read_back(&properties, id).map_err(ServiceError::during(OPERATION))
        });

        log_write(OPERATION, Some(id), started_at, &result);
        result
    }

    /// Deletes property `id` and, by cascade, its tax record.
    ///
    /// # Errors
    /// - `NotFound` when the property does not exist.
    pub fn delete_property(&mut self, id: PropertyId) -> ServiceResult<DeletedProperty> {
        const OPERATION: &str = "delete_property";
        let started_at = Instant::now();

        let result = self.in_transaction(OPERATION, |tx| {
            let properties = SqlitePropertyRepository::new(tx);
            let cadastral_code = properties
                .cadastral_code_of(id)
                .map_err(ServiceError::during(OPERATION))?
                .ok_or(ServiceError::NotFound(id))?;
            properties
                .delete(id)
                .map_err(ServiceError::during(OPERATION))?;
            Ok(DeletedProperty { id, cadastral_code })
        });

        log_write(OPERATION, Some(id), started_at, &result);
        result
    }

    fn in_transaction<T>(
        &mut self,
        operation: &'static str,
        body: impl FnOnce(&Transaction<'_>) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| ServiceError::storage(operation, err.into()))?;
        let value = body(&tx)?;
        tx.commit()
            .map_err(|err| ServiceError::storage(operation, err.into()))?;
        Ok(value)
    }
}

fn duplicate_code(cadastral_code: &str) -> ServiceError {
    ServiceError::DuplicateKey(format!(
        "codigo_catastral `{cadastral_code}` already exists"
    ))
}

fn read_back(properties: &SqlitePropertyRepository<'_>, id: PropertyId) -> RepoResult<Feature> {
    properties.get_feature(id)?.ok_or_else(|| {
        RepoError::InvalidData(format!("property {id} missing from read model after write"))
    })
}

/// Renames the taxpayer linked through the property's tax record. The row is
/// shared, so every property of that taxpayer sees the new name.
fn rename_taxpayer(conn: &Connection, property_id: PropertyId, name: &str) -> RepoResult<()> {
    let taxpayers = SqliteTaxpayerRepository::new(conn);
    let Some(taxpayer_id) = taxpayers.find_for_property(property_id)? else {
        return Ok(());
    };

    let linked = taxpayers.linked_property_count(taxpayer_id)?;
    if linked > 1 {
        warn!(
            "event=taxpayer_rename module=service status=shared taxpayer_id={} linked_properties={}",
            taxpayer_id, linked
        );
    }
    taxpayers.rename(taxpayer_id, name)?;
    Ok(())
}

fn log_write<T>(
    operation: &str,
    id: Option<PropertyId>,
    started_at: Instant,
    result: &ServiceResult<T>,
) {
    let duration_ms = started_at.elapsed().as_millis();
    let id = id.map_or_else(|| "-".to_string(), |id| id.to_string());
    match result {
        Ok(_) => info!(
            "event=property_write module=service status=ok operation={} id={} duration_ms={}",
            operation, id, duration_ms
        ),
        Err(
            err @ (ServiceError::Validation(_)
            | ServiceError::NotFound(_)
            | ServiceError::DuplicateKey(_)),
        ) => warn!(
            "event=property_write module=service status=rejected operation={} id={} duration_ms={} error={}",
            operation, id, duration_ms, err
        ),
        Err(err) => error!(
            "event=property_write module=service status=error operation={} id={} duration_ms={} rolled_back=true error={}",
            operation, id, duration_ms, err
        ),
    }
}
