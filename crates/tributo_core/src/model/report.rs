//! Aggregate report shapes: municipal statistics and per-sector rollups.

use super::property::PaymentStatus;
use super::round2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Municipality-wide summary figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(rename = "total_predios")]
    pub total_properties: i64,
    /// Tax records across all statuses.
    #[serde(rename = "total_contribuyentes")]
    pub total_taxpayers: i64,
    /// Summed debt of delinquent records.
    #[serde(rename = "deuda_total_municipal")]
    pub total_debt: f64,
    #[serde(rename = "promedio_ingreso_familiar")]
    pub average_household_income: f64,
    /// `al_dia / total_contribuyentes * 100`.
    #[serde(rename = "porcentaje_cumplimiento")]
    pub compliance_percentage: f64,
}

/// Count and debt for one payment status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusBucket {
    #[serde(rename = "cantidad")]
    pub count: i64,
    #[serde(rename = "deuda_total")]
    pub total_debt: f64,
}

/// Sector with the highest summed delinquent debt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalSector {
    /// `None` when no property is delinquent.
    #[serde(rename = "nombre")]
    pub name: Option<String>,
    #[serde(rename = "cantidad_morosos")]
    pub delinquent_count: i64,
    #[serde(rename = "deuda_total")]
    pub total_debt: f64,
}

/// Record counts per payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Indicators {
    #[serde(rename = "morosos")]
    pub delinquent: i64,
    #[serde(rename = "al_dia")]
    pub up_to_date: i64,
    #[serde(rename = "exonerados")]
    pub exempt: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    #[serde(rename = "resumen")]
    pub summary: Summary,
    /// Only statuses with at least one record appear.
    #[serde(rename = "distribucion_estado")]
    pub status_distribution: BTreeMap<PaymentStatus, StatusBucket>,
    #[serde(rename = "sector_critico")]
    pub critical_sector: CriticalSector,
    #[serde(rename = "indicadores")]
    pub indicators: Indicators,
}

/// Raw aggregates as read from storage, before rounding.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatisticsTotals {
    pub total_properties: i64,
    pub delinquent_debt: f64,
    /// Average over non-null incomes; 0 when there are none.
    pub average_household_income: f64,
    pub status_buckets: Vec<(PaymentStatus, i64, f64)>,
    pub critical_sector: Option<(String, i64, f64)>,
}

impl StatisticsReport {
    /// Builds the rounded report from raw totals.
    ///
    /// Compliance is exactly 0 when no tax record exists.
    pub fn from_totals(totals: StatisticsTotals) -> Self {
        let mut status_distribution = BTreeMap::new();
        let mut indicators = Indicators::default();
        for (status, count, debt) in totals.status_buckets {
            match status {
                PaymentStatus::Moroso => indicators.delinquent = count,
                PaymentStatus::AlDia => indicators.up_to_date = count,
                PaymentStatus::Exonerado => indicators.exempt = count,
            }
            status_distribution.insert(
                status,
                StatusBucket {
                    count,
                    total_debt: round2(debt),
                },
            );
        }

        let total_taxpayers = indicators.delinquent + indicators.up_to_date + indicators.exempt;
        let compliance_percentage = if total_taxpayers == 0 {
            0.0
        } else {
            round2(indicators.up_to_date as f64 / total_taxpayers as f64 * 100.0)
        };

        let critical_sector = match totals.critical_sector {
            Some((name, delinquent_count, debt)) => CriticalSector {
                name: Some(name),
                delinquent_count,
                total_debt: round2(debt),
            },
            None => CriticalSector {
                name: None,
                delinquent_count: 0,
                total_debt: 0.0,
            },
        };

        Self {
            summary: Summary {
                total_properties: totals.total_properties,
                total_taxpayers,
                total_debt: round2(totals.delinquent_debt),
                average_household_income: round2(totals.average_household_income),
                compliance_percentage,
            },
            status_distribution,
            critical_sector,
            indicators,
        }
    }
}

/// Per-sector rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorReport {
    pub sector: String,
    #[serde(rename = "total_predios")]
    pub total_properties: i64,
    #[serde(rename = "morosos")]
    pub delinquent: i64,
    #[serde(rename = "al_dia")]
    pub up_to_date: i64,
    #[serde(rename = "deuda_total")]
    pub total_debt: f64,
    /// `morosos / total_predios * 100`.
    #[serde(rename = "porcentaje_morosidad")]
    pub delinquency_percentage: f64,
}

impl SectorReport {
    pub fn new(
        sector: String,
        total_properties: i64,
        delinquent: i64,
        up_to_date: i64,
        total_debt: f64,
    ) -> Self {
        let delinquency_percentage = if total_properties == 0 {
            0.0
        } else {
            round2(delinquent as f64 / total_properties as f64 * 100.0)
        };
        Self {
            sector,
            total_properties,
            delinquent,
            up_to_date,
            total_debt: round2(total_debt),
            delinquency_percentage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PaymentStatus, SectorReport, StatisticsReport, StatisticsTotals};
    use serde_json::json;

    #[test]
    fn empty_totals_report_zero_compliance_and_no_critical_sector() {
        let report = StatisticsReport::from_totals(StatisticsTotals::default());
        assert_eq!(report.summary.compliance_percentage, 0.0);
        assert!(report.status_distribution.is_empty());
        assert_eq!(report.critical_sector.name, None);
        assert_eq!(report.indicators.delinquent, 0);
    }

    #[test]
    fn report_rounds_and_serializes_wire_names() {
        let report = StatisticsReport::from_totals(StatisticsTotals {
            total_properties: 4,
            delinquent_debt: 450.004,
            average_household_income: 1200.0 / 3.0,
            status_buckets: vec![
                (PaymentStatus::AlDia, 1, 0.0),
                (PaymentStatus::Moroso, 2, 450.005),
            ],
            critical_sector: Some(("Jayllihuaya".to_string(), 2, 450.005)),
        });

        assert_eq!(report.summary.compliance_percentage, 33.33);
        assert_eq!(report.summary.total_taxpayers, 3);
        assert_eq!(report.summary.total_debt, 450.0);
        assert_eq!(report.summary.average_household_income, 400.0);
        assert_eq!(report.indicators.up_to_date, 1);
        assert_eq!(report.indicators.delinquent, 2);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["distribucion_estado"]["MOROSO"]["cantidad"], json!(2));
        assert_eq!(value["sector_critico"]["nombre"], json!("Jayllihuaya"));
        assert_eq!(value["resumen"]["total_predios"], json!(4));
        assert!(value["distribucion_estado"].get("EXONERADO").is_none());
    }

    #[test]
    fn sector_report_computes_delinquency_percentage() {
        let sector = SectorReport::new("Centro".to_string(), 3, 1, 2, 99.999);
        assert_eq!(sector.delinquency_percentage, 33.33);
        assert_eq!(sector.total_debt, 100.0);
    }
}
