use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::{ExtractionMethod, Extraction};

pub fn insert_extraction(conn: &Connection, extraction: &Extraction) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO pdf_extractions (id, report_id, extracted_text, page_count, extraction_method, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            extraction.id.to_string(),
            extraction.report_id.to_string(),
            extraction.text,
            extraction.page_count,
            extraction.method.as_str(),
            extraction.created_at,
        ],
    )?;
    Ok(())
}

struct ExtractionRow {
    id: String,
    report_id: String,
    text: String,
    page_count: u32,
    method: String,
    created_at: DateTime<Utc>,
}

/// Most recent extraction for a report. Older rows are ignored.
pub fn latest_extraction(conn: &Connection, report_id: &Uuid) -> Result<Option<Extraction>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, report_id, extracted_text, page_count, extraction_method, created_at
             FROM pdf_extractions
             WHERE report_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT 1",
            params![report_id.to_string()],
            |row| {
                Ok(ExtractionRow {
                    id: row.get(0)?,
                    report_id: row.get(1)?,
                    text: row.get(2)?,
                    page_count: row.get(3)?,
                    method: row.get(4)?,
                    created_at: row.get(5)?,
                })
            },
        )
        .optional()?;

    match row {
        Some(row) => Ok(Some(Extraction {
            id: parse_uuid("pdf_extractions.id", &row.id)?,
            report_id: parse_uuid("pdf_extractions.report_id", &row.report_id)?,
            text: row.text,
            page_count: row.page_count,
            method: row.method.parse::<ExtractionMethod>()?,
            created_at: row.created_at,
        })),
        None => Ok(None),
    }
}

/// Delete every cached extraction of a report. Returns the number of rows removed.
pub fn delete_extractions(conn: &Connection, report_id: &Uuid) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM pdf_extractions WHERE report_id = ?1",
        params![report_id.to_string()],
    )?;
    Ok(deleted)
}
