use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::{Company, Report, ReportContext};

const UNKNOWN_COMPANY: &str = "Unknown Company";
const UNKNOWN_INDUSTRY: &str = "Unknown Industry";

pub fn insert_company(conn: &Connection, company: &Company) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO companies (id, name, ticker, industry, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            company.id.to_string(),
            company.name,
            company.ticker,
            company.industry,
            company.created_at,
        ],
    )?;
    Ok(())
}

pub fn insert_report(conn: &Connection, report: &Report) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO annual_reports (id, company_id, report_type, fiscal_year, filing_date,
         document_location, processed, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            report.id.to_string(),
            report.company_id.to_string(),
            report.report_type,
            report.fiscal_year,
            report.filing_date,
            report.document_location,
            report.processed,
            report.created_at,
        ],
    )?;
    Ok(())
}

struct ReportRow {
    id: String,
    company_id: String,
    report_type: String,
    fiscal_year: i32,
    filing_date: Option<NaiveDate>,
    document_location: String,
    processed: bool,
    created_at: DateTime<Utc>,
}

fn report_from_row(row: ReportRow) -> Result<Report, DatabaseError> {
    Ok(Report {
        id: parse_uuid("annual_reports.id", &row.id)?,
        company_id: parse_uuid("annual_reports.company_id", &row.company_id)?,
        report_type: row.report_type,
        fiscal_year: row.fiscal_year,
        filing_date: row.filing_date,
        document_location: row.document_location,
        processed: row.processed,
        created_at: row.created_at,
    })
}

pub fn get_report(conn: &Connection, id: &Uuid) -> Result<Option<Report>, DatabaseError> {
    Ok(get_report_context(conn, id)?.map(|ctx| ctx.report))
}

/// Load a report together with its company's name and industry.
/// Missing company fields fall back to "Unknown Company" / "Unknown Industry".
pub fn get_report_context(conn: &Connection, id: &Uuid) -> Result<Option<ReportContext>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT r.id, r.company_id, r.report_type, r.fiscal_year, r.filing_date,
                    r.document_location, r.processed, r.created_at, c.name, c.industry
             FROM annual_reports r
             LEFT JOIN companies c ON c.id = r.company_id
             WHERE r.id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    ReportRow {
                        id: row.get(0)?,
                        company_id: row.get(1)?,
                        report_type: row.get(2)?,
                        fiscal_year: row.get(3)?,
                        filing_date: row.get(4)?,
                        document_location: row.get(5)?,
                        processed: row.get(6)?,
                        created_at: row.get(7)?,
                    },
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, Option<String>>(9)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((report, name, industry)) => Ok(Some(ReportContext {
            report: report_from_row(report)?,
            company_name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
            industry: industry
                .filter(|i| !i.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_INDUSTRY.to_string()),
        })),
        None => Ok(None),
    }
}

pub fn report_exists(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM annual_reports WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn mark_report_processed(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE annual_reports SET processed = 1 WHERE id = ?1",
        params![id.to_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "AnnualReport".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{seed_company, seed_report};
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn report_context_carries_company_fields() {
        let conn = open_memory_database().unwrap();
        let company = seed_company(&conn, "Acme", Some("Technology"));
        let report = seed_report(&conn, &company, 2023);

        let ctx = get_report_context(&conn, &report.id).unwrap().unwrap();
        assert_eq!(ctx.company_name, "Acme");
        assert_eq!(ctx.industry, "Technology");
        assert_eq!(ctx.report.fiscal_year, 2023);
        assert!(!ctx.report.processed);
    }

    #[test]
    fn missing_industry_defaults_to_unknown() {
        let conn = open_memory_database().unwrap();
        let company = seed_company(&conn, "Acme", None);
        let report = seed_report(&conn, &company, 2022);

        let ctx = get_report_context(&conn, &report.id).unwrap().unwrap();
        assert_eq!(ctx.industry, "Unknown Industry");
    }

    #[test]
    fn unknown_report_is_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_report(&conn, &Uuid::new_v4()).unwrap().is_none());
        assert!(!report_exists(&conn, &Uuid::new_v4()).unwrap());
    }

    #[test]
    fn mark_processed_sets_flag() {
        let conn = open_memory_database().unwrap();
        let company = seed_company(&conn, "Acme", None);
        let report = seed_report(&conn, &company, 2022);

        mark_report_processed(&conn, &report.id).unwrap();
        assert!(get_report(&conn, &report.id).unwrap().unwrap().processed);
    }

    #[test]
    fn mark_processed_unknown_report_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = mark_report_processed(&conn, &Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
