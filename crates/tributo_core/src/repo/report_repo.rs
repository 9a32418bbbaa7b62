//! Read-only aggregates for municipal reporting.
//!
//! # Invariants
//! - Returned figures are raw; rounding happens when report models are built.
//! - The critical sector is the one with the highest summed delinquent debt;
//!   ties go to the sector whose first property was stored earliest.
//! - Statistics totals are read from a single snapshot.

use super::{RepoError, RepoResult};
use crate::model::property::PaymentStatus;
use crate::model::report::{SectorReport, StatisticsTotals};
use rusqlite::{Connection, OptionalExtension};

pub trait ReportRepository {
    fn statistics_totals(&self) -> RepoResult<StatisticsTotals>;
    fn sector_reports(&self) -> RepoResult<Vec<SectorReport>>;
}

pub struct SqliteReportRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReportRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ReportRepository for SqliteReportRepository<'_> {
    /// Every figure comes from one snapshot: a deferred read transaction
    /// that ends before returning.
    fn statistics_totals(&self) -> RepoResult<StatisticsTotals> {
        let tx = self.conn.unchecked_transaction()?;

        let total_properties: i64 =
            tx.query_row("SELECT COUNT(*) FROM predios;", [], |row| row.get(0))?;

        let status_buckets = {
            let mut stmt = tx.prepare(
                "SELECT estado_pago, COUNT(*), COALESCE(SUM(deuda_total), 0)
                 FROM tributos
                 GROUP BY estado_pago
                 ORDER BY estado_pago ASC;",
            )?;
            let mut rows = stmt.query([])?;
            let mut buckets = Vec::new();
            while let Some(row) = rows.next()? {
                let label: String = row.get(0)?;
                let status = PaymentStatus::parse(&label).ok_or_else(|| {
                    RepoError::InvalidData(format!(
                        "invalid payment status `{label}` in tributos.estado_pago"
                    ))
                })?;
                buckets.push((status, row.get(1)?, row.get(2)?));
            }
            buckets
        };

        let delinquent_debt: f64 = tx.query_row(
            "SELECT COALESCE(SUM(deuda_total), 0)
             FROM tributos
             WHERE estado_pago = 'MOROSO';",
            [],
            |row| row.get(0),
        )?;

        let critical_sector = tx
            .query_row(
                "SELECT p.sector, COUNT(*) AS cantidad_morosos, SUM(t.deuda_total) AS deuda_sector
                 FROM predios p
                 JOIN tributos t ON t.id_predio = p.id_predio
                 WHERE t.estado_pago = 'MOROSO'
                 GROUP BY p.sector
                 ORDER BY deuda_sector DESC, MIN(p.id_predio) ASC
                 LIMIT 1;",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let average_household_income: f64 = tx.query_row(
            "SELECT COALESCE(AVG(ingreso_familiar), 0)
             FROM tributos
             WHERE ingreso_familiar IS NOT NULL;",
            [],
            |row| row.get(0),
        )?;

        tx.commit()?;

        Ok(StatisticsTotals {
            total_properties,
            delinquent_debt,
            average_household_income,
            status_buckets,
            critical_sector,
        })
    }

    fn sector_reports(&self) -> RepoResult<Vec<SectorReport>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                p.sector,
                COUNT(*) AS total_predios,
                COUNT(CASE WHEN t.estado_pago = 'MOROSO' THEN 1 END) AS morosos,
                COUNT(CASE WHEN t.estado_pago = 'AL_DIA' THEN 1 END) AS al_dia,
                COALESCE(SUM(CASE WHEN t.estado_pago = 'MOROSO' THEN t.deuda_total ELSE 0 END), 0)
                    AS deuda_total
             FROM predios p
             LEFT JOIN tributos t ON t.id_predio = p.id_predio
             GROUP BY p.sector
             ORDER BY deuda_total DESC, p.sector ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut sectors = Vec::new();
        while let Some(row) = rows.next()? {
            sectors.push(SectorReport::new(
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ));
        }
        Ok(sectors)
    }
}
