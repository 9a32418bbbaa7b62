use rusqlite::Connection;
use serde_json::json;
use std::panic::AssertUnwindSafe;
use tributo_core::db::{open_db, open_db_in_memory};
use tributo_core::{
    PaymentStatus, PropertyInput, PropertyWriteService, ReportRepository, ReportService,
    SqliteReportRepository,
};

fn create(conn: &mut Connection, code: &str, sector: &str, customize: impl FnOnce(&mut PropertyInput)) {
    let mut input = PropertyInput::new(code, format!("Contribuyente {code}"), -70.0125, -15.8402);
    input.sector = sector.to_string();
    customize(&mut input);
    PropertyWriteService::new(conn).create_property(&input).unwrap();
}

#[test]
fn empty_store_reports_zero_compliance() {
    let conn = open_db_in_memory().unwrap();
    let service = ReportService::new(SqliteReportRepository::new(&conn));

    let report = service.statistics().unwrap();
    assert_eq!(report.summary.total_properties, 0);
    assert_eq!(report.summary.total_taxpayers, 0);
    assert_eq!(report.summary.compliance_percentage, 0.0);
    assert_eq!(report.critical_sector.name, None);
    assert!(service.sectors().unwrap().is_empty());
}

#[test]
fn one_delinquent_and_one_exempt_property() {
    let mut conn = open_db_in_memory().unwrap();
    create(&mut conn, "HOG0001", "Jayllihuaya", |input| input.tax_amount = 150.0);
    create(&mut conn, "HOG0002", "Jayllihuaya", |_| {});

    let report = ReportService::new(SqliteReportRepository::new(&conn))
        .statistics()
        .unwrap();
    assert_eq!(report.indicators.delinquent, 1);
    assert_eq!(report.indicators.exempt, 1);
    assert_eq!(report.indicators.up_to_date, 0);
    assert_eq!(report.summary.total_debt, 150.0);
    assert_eq!(report.summary.compliance_percentage, 0.0);

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["indicadores"]["morosos"], 1);
    assert_eq!(
        value["distribucion_estado"],
        json!({
            "MOROSO": {"cantidad": 1, "deuda_total": 150.0},
            "EXONERADO": {"cantidad": 1, "deuda_total": 0.0}
        })
    );
}

#[test]
fn statistics_aggregate_across_sectors() {
    let mut conn = open_db_in_memory().unwrap();
    create(&mut conn, "HOG0001", "Jayllihuaya", |input| {
        input.tax_amount = 100.0;
        input.household_income = 900.0;
    });
    create(&mut conn, "HOG0002", "Centro", |input| {
        input.tax_amount = 200.0;
        input.fee_amount = 20.556;
        input.household_income = 1_500.0;
    });
    create(&mut conn, "HOG0003", "Centro", |input| {
        input.tax_amount = 80.0;
        input.tax_paid = true;
        input.household_income = 1_000.0;
    });
    create(&mut conn, "HOG0004", "Salcedo", |input| {
        input.tax_amount = 60.0;
        input.tax_paid = true;
        input.household_income = 1_001.0;
    });
    // A property without a tax record counts as a property only.
    conn.execute(
        "INSERT INTO predios (codigo_catastral, longitud, latitud, sector)
         VALUES ('HOG0005', -70.0, -15.8, 'Salcedo');",
        [],
    )
    .unwrap();

    let service = ReportService::new(SqliteReportRepository::new(&conn));
    let report = service.statistics().unwrap();

    assert_eq!(report.summary.total_properties, 5);
    assert_eq!(report.summary.total_taxpayers, 4);
    assert_eq!(report.summary.total_debt, 320.56);
    assert_eq!(report.summary.average_household_income, 1_100.25);
    assert_eq!(report.summary.compliance_percentage, 50.0);
    assert_eq!(report.critical_sector.name.as_deref(), Some("Centro"));
    assert_eq!(report.critical_sector.delinquent_count, 1);
    assert_eq!(report.critical_sector.total_debt, 220.56);
    assert_eq!(
        report.status_distribution[&PaymentStatus::AlDia].count,
        2
    );

    let sectors = service.sectors().unwrap();
    let names = sectors
        .iter()
        .map(|sector| sector.sector.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Centro", "Jayllihuaya", "Salcedo"]);

    let centro = &sectors[0];
    assert_eq!(centro.total_properties, 2);
    assert_eq!(centro.delinquent, 1);
    assert_eq!(centro.up_to_date, 1);
    assert_eq!(centro.delinquency_percentage, 50.0);

    let salcedo = &sectors[2];
    assert_eq!(salcedo.total_properties, 2);
    assert_eq!(salcedo.delinquent, 0);
    assert_eq!(salcedo.total_debt, 0.0);
    assert_eq!(salcedo.delinquency_percentage, 0.0);
}

#[test]
fn critical_sector_tie_goes_to_the_earliest_stored_sector() {
    let mut conn = open_db_in_memory().unwrap();
    create(&mut conn, "HOG0001", "Salcedo", |input| input.tax_amount = 100.0);
    create(&mut conn, "HOG0002", "Centro", |input| input.tax_amount = 100.0);

    let report = ReportService::new(SqliteReportRepository::new(&conn))
        .statistics()
        .unwrap();
    assert_eq!(report.critical_sector.name.as_deref(), Some("Salcedo"));
}

#[test]
fn average_income_skips_records_without_income() {
    let mut conn = open_db_in_memory().unwrap();
    create(&mut conn, "HOG0001", "Jayllihuaya", |input| {
        input.tax_amount = 50.0;
        input.household_income = 800.0;
    });
    conn.execute_batch(
        "INSERT INTO contribuyentes (nombres) VALUES ('Sin Ingreso');
         INSERT INTO predios (codigo_catastral, longitud, latitud, sector)
         VALUES ('HOG0002', -70.0, -15.8, 'Jayllihuaya');
         INSERT INTO tributos (id_predio, id_contribuyente, monto_impuesto, ingreso_familiar)
         VALUES (2, 2, 30.0, NULL);",
    )
    .unwrap();

    let report = ReportService::new(SqliteReportRepository::new(&conn))
        .statistics()
        .unwrap();
    assert_eq!(report.summary.total_taxpayers, 2);
    assert_eq!(report.summary.average_household_income, 800.0);
}

#[test]
fn statistics_ignore_writes_committed_while_reading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tributo.sqlite3");

    let mut reader = open_db(&path).unwrap();
    let mode: String = reader
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
    create(&mut reader, "HOG0001", "Jayllihuaya", |input| input.tax_amount = 100.0);

    // Another connection commits a new property once the report has
    // finished its first statement.
    let mut writer = AssertUnwindSafe(Some(open_db(&path).unwrap()));
    let mut steps = 0;
    reader.progress_handler(
        1,
        Some(move || {
            steps += 1;
            if steps >= 30 {
                if let Some(mut conn) = writer.take() {
                    create(&mut conn, "HOG0002", "Centro", |input| input.tax_amount = 50.0);
                }
            }
            false
        }),
    );

    let totals = SqliteReportRepository::new(&reader)
        .statistics_totals()
        .unwrap();
    reader.progress_handler(0, None::<fn() -> bool>);

    let tax_records: i64 = totals.status_buckets.iter().map(|(_, count, _)| count).sum();
    assert_eq!(totals.total_properties, tax_records);
    let bucketed_debt: f64 = totals
        .status_buckets
        .iter()
        .filter(|(status, _, _)| *status == PaymentStatus::Moroso)
        .map(|(_, _, debt)| debt)
        .sum();
    assert_eq!(totals.delinquent_debt, bucketed_debt);

    let stored: i64 = reader
        .query_row("SELECT COUNT(*) FROM predios;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(stored, 2);
}
