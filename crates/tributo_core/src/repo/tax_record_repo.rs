//! Tax record writes. Debt and payment status are derived by storage.

use super::RepoResult;
use crate::model::property::{PropertyId, PropertyInput, TaxpayerId};
use crate::query::UpdateStatement;
use rusqlite::{params, params_from_iter, Connection};

pub struct SqliteTaxRecordRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaxRecordRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Inserts the single tax record of a property and returns its id.
    pub fn insert(
        &self,
        property_id: PropertyId,
        taxpayer_id: TaxpayerId,
        input: &PropertyInput,
    ) -> RepoResult<i64> {
        self.conn.execute(
            "INSERT INTO tributos (
                id_predio,
                id_contribuyente,
                monto_impuesto,
                pago_impuesto,
                monto_arbitrios,
                pago_arbitrios,
                ingreso_familiar,
                cantidad_personas,
                nivel_educativo_jefe,
                servicios_basicos
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                property_id,
                taxpayer_id,
                input.tax_amount,
                input.tax_paid,
                input.fee_amount,
                input.fee_paid,
                input.household_income,
                input.household_size,
                input.education_level.as_deref(),
                input.basic_services.as_deref(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Applies a partial update to the property's tax record.
    /// Returns the number of rows changed.
    pub fn apply_update(&self, property_id: PropertyId, update: &UpdateStatement) -> RepoResult<usize> {
        let Some(built) = update.build("id_predio", property_id) else {
            return Ok(0);
        };
        Ok(self
            .conn
            .execute(&built.sql, params_from_iter(built.params))?)
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteTaxRecordRepository;
    use crate::db::open_db_in_memory;
    use crate::geo::make_point;
    use crate::model::property::PropertyInput;
    use crate::query::UpdateStatement;
    use crate::repo::property_repo::SqlitePropertyRepository;
    use crate::repo::taxpayer_repo::SqliteTaxpayerRepository;

    fn status_and_debt(conn: &rusqlite::Connection, property_id: i64) -> (String, f64) {
        conn.query_row(
            "SELECT estado_pago, deuda_total FROM tributos WHERE id_predio = ?1;",
            [property_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap()
    }

    #[test]
    fn storage_derives_status_and_debt() {
        let conn = open_db_in_memory().unwrap();
        let mut input = PropertyInput::new("HOG0001", "Ana Quispe", -70.0, -15.8);
        input.tax_amount = 120.0;
        input.fee_amount = 30.5;
        input.fee_paid = true;

        let property_id = SqlitePropertyRepository::new(&conn)
            .insert(&input, &make_point(input.longitude, input.latitude).unwrap())
            .unwrap();
        let taxpayer = SqliteTaxpayerRepository::new(&conn)
            .find_or_create("Ana Quispe", None, None)
            .unwrap();
        let records = SqliteTaxRecordRepository::new(&conn);
        records.insert(property_id, taxpayer.id, &input).unwrap();
        assert_eq!(status_and_debt(&conn, property_id), ("MOROSO".to_string(), 120.0));

        let mut update = UpdateStatement::new("tributos");
        update.set("pago_impuesto", true);
        assert_eq!(records.apply_update(property_id, &update).unwrap(), 1);
        assert_eq!(status_and_debt(&conn, property_id), ("AL_DIA".to_string(), 0.0));

        let mut update = UpdateStatement::new("tributos");
        update.set("monto_impuesto", 0.0);
        update.set("monto_arbitrios", 0.0);
        records.apply_update(property_id, &update).unwrap();
        assert_eq!(status_and_debt(&conn, property_id), ("EXONERADO".to_string(), 0.0));
    }
}
