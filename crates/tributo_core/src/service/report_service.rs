//! Municipal statistics and per-sector rollups.

use super::{ServiceError, ServiceResult};
use crate::model::report::{SectorReport, StatisticsReport};
use crate::repo::report_repo::ReportRepository;
use log::{error, info};
use std::time::Instant;

/// Use-case service for aggregate reports.
pub struct ReportService<R: ReportRepository> {
    repo: R,
}

impl<R: ReportRepository> ReportService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Municipality-wide summary, status distribution and critical sector.
    pub fn statistics(&self) -> ServiceResult<StatisticsReport> {
        let started_at = Instant::now();
        let result = self
            .repo
            .statistics_totals()
            .map(StatisticsReport::from_totals)
            .map_err(ServiceError::during("statistics"));
        log_report("statistics", started_at, result.as_ref().err());
        result
    }

    /// Every sector with at least one property, highest delinquent debt first.
    pub fn sectors(&self) -> ServiceResult<Vec<SectorReport>> {
        let started_at = Instant::now();
        let result = self
            .repo
            .sector_reports()
            .map_err(ServiceError::during("sectors"));
        log_report("sectors", started_at, result.as_ref().err());
        result
    }
}

fn log_report(operation: &str, started_at: Instant, err: Option<&ServiceError>) {
    let duration_ms = started_at.elapsed().as_millis();
    match err {
        None => info!(
            "event=report module=service status=ok operation={} duration_ms={}",
            operation, duration_ms
        ),
        Some(err) => error!(
            "event=report module=service status=error operation={} duration_ms={} error={}",
            operation, duration_ms, err
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::ReportService;
    use crate::model::property::PaymentStatus;
    use crate::model::report::{SectorReport, StatisticsTotals};
    use crate::repo::report_repo::ReportRepository;
    use crate::repo::{RepoError, RepoResult};
    use crate::service::ServiceError;

    struct FixedReports {
        fail: bool,
    }

    impl ReportRepository for FixedReports {
        fn statistics_totals(&self) -> RepoResult<StatisticsTotals> {
            if self.fail {
                return Err(RepoError::InvalidData("broken".to_string()));
            }
            Ok(StatisticsTotals {
                total_properties: 2,
                delinquent_debt: 150.0,
                average_household_income: 0.0,
                status_buckets: vec![
                    (PaymentStatus::Moroso, 1, 150.0),
                    (PaymentStatus::Exonerado, 1, 0.0),
                ],
                critical_sector: Some(("Jayllihuaya".to_string(), 1, 150.0)),
            })
        }

        fn sector_reports(&self) -> RepoResult<Vec<SectorReport>> {
            Ok(vec![SectorReport::new("Jayllihuaya".to_string(), 2, 1, 0, 150.0)])
        }
    }

    #[test]
    fn statistics_builds_report_from_totals() {
        let service = ReportService::new(FixedReports { fail: false });
        let report = service.statistics().unwrap();
        assert_eq!(report.indicators.delinquent, 1);
        assert_eq!(report.indicators.exempt, 1);
        assert_eq!(report.summary.compliance_percentage, 0.0);
        assert_eq!(report.critical_sector.name.as_deref(), Some("Jayllihuaya"));

        let sectors = service.sectors().unwrap();
        assert_eq!(sectors[0].delinquency_percentage, 50.0);
    }

    #[test]
    fn repository_failure_is_a_storage_error() {
        let service = ReportService::new(FixedReports { fail: true });
        assert!(matches!(
            service.statistics(),
            Err(ServiceError::Storage {
                operation: "statistics",
                ..
            })
        ));
    }
}
