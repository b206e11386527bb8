//! Durable insight processing queue.
//!
//! State lives in `(started_at, completed_at, retry_count, max_retries)`:
//! claimable items have `started_at IS NULL` and are due; terminal failures
//! keep their claim and have `retry_count >= max_retries`.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{parse_json, parse_uuid, to_json};
use crate::db::DatabaseError;
use crate::models::{InsightType, QueueCounts, QueueItem, QueueItemSummary};

const QUEUE_COLUMNS: &str = "q.id, q.report_id, q.insight_types, q.priority, q.scheduled_for,
    q.started_at, q.completed_at, q.retry_count, q.max_retries, q.error_message, q.created_at";

pub fn insert_queue_item(conn: &Connection, item: &QueueItem) -> Result<(), DatabaseError> {
    let types: Vec<&str> = item.insight_types.iter().map(|t| t.as_str()).collect();
    conn.execute(
        "INSERT INTO insight_processing_queue (id, report_id, insight_types, priority, scheduled_for,
         started_at, completed_at, retry_count, max_retries, error_message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            item.id.to_string(),
            item.report_id.to_string(),
            to_json("insight_processing_queue.insight_types", &types)?,
            item.priority,
            item.scheduled_for,
            item.started_at,
            item.completed_at,
            item.retry_count,
            item.max_retries,
            item.error_message,
            item.created_at,
        ],
    )?;
    Ok(())
}

struct QueueRow {
    id: String,
    report_id: String,
    insight_types: String,
    priority: i64,
    scheduled_for: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    retry_count: u32,
    max_retries: u32,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

fn map_queue_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueRow> {
    Ok(QueueRow {
        id: row.get(0)?,
        report_id: row.get(1)?,
        insight_types: row.get(2)?,
        priority: row.get(3)?,
        scheduled_for: row.get(4)?,
        started_at: row.get(5)?,
        completed_at: row.get(6)?,
        retry_count: row.get(7)?,
        max_retries: row.get(8)?,
        error_message: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn queue_item_from_row(row: QueueRow) -> Result<QueueItem, DatabaseError> {
    let names: Vec<String> = parse_json("insight_processing_queue.insight_types", &row.insight_types)?;
    Ok(QueueItem {
        id: parse_uuid("insight_processing_queue.id", &row.id)?,
        report_id: parse_uuid("insight_processing_queue.report_id", &row.report_id)?,
        insight_types: names.iter().map(|n| InsightType::parse_lenient(n)).collect(),
        priority: row.priority,
        scheduled_for: row.scheduled_for,
        started_at: row.started_at,
        completed_at: row.completed_at,
        retry_count: row.retry_count,
        max_retries: row.max_retries,
        error_message: row.error_message,
        created_at: row.created_at,
    })
}

pub fn get_queue_item(conn: &Connection, id: &Uuid) -> Result<Option<QueueItem>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {QUEUE_COLUMNS} FROM insight_processing_queue q WHERE q.id = ?1"),
            params![id.to_string()],
            map_queue_row,
        )
        .optional()?;
    row.map(queue_item_from_row).transpose()
}

/// Unclaimed items due at `now`, highest priority first, earliest due first
/// within a priority.
pub fn select_claimable(
    conn: &Connection,
    now: DateTime<Utc>,
    limit: u32,
) -> Result<Vec<QueueItem>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {QUEUE_COLUMNS} FROM insight_processing_queue q
         WHERE q.started_at IS NULL AND q.scheduled_for <= ?1
         ORDER BY q.priority DESC, q.scheduled_for ASC, q.rowid ASC
         LIMIT ?2"
    ))?;
    let rows = stmt
        .query_map(params![now, limit], map_queue_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(queue_item_from_row).collect()
}

/// Compare-and-set claim. Returns false when another processor got there first.
pub fn claim_queue_item(conn: &Connection, id: &Uuid, now: DateTime<Utc>) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE insight_processing_queue SET started_at = ?1
         WHERE id = ?2 AND started_at IS NULL",
        params![now, id.to_string()],
    )?;
    Ok(updated == 1)
}

pub fn complete_queue_item(conn: &Connection, id: &Uuid, now: DateTime<Utc>) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE insight_processing_queue SET completed_at = ?1, error_message = NULL WHERE id = ?2",
        params![now, id.to_string()],
    )?;
    Ok(())
}

/// Return a claimed item to pending with a later due time.
pub fn reschedule_queue_item(
    conn: &Connection,
    id: &Uuid,
    insight_types: &[InsightType],
    retry_count: u32,
    scheduled_for: DateTime<Utc>,
    error_message: &str,
) -> Result<(), DatabaseError> {
    let types: Vec<&str> = insight_types.iter().map(|t| t.as_str()).collect();
    conn.execute(
        "UPDATE insight_processing_queue
         SET started_at = NULL, insight_types = ?1, retry_count = ?2, scheduled_for = ?3, error_message = ?4
         WHERE id = ?5",
        params![
            to_json("insight_processing_queue.insight_types", &types)?,
            retry_count,
            scheduled_for,
            error_message,
            id.to_string(),
        ],
    )?;
    Ok(())
}

/// Terminal failure: the claim is kept so the item is never selected again.
pub fn fail_queue_item(
    conn: &Connection,
    id: &Uuid,
    insight_types: &[InsightType],
    retry_count: u32,
    error_message: &str,
) -> Result<(), DatabaseError> {
    let types: Vec<&str> = insight_types.iter().map(|t| t.as_str()).collect();
    conn.execute(
        "UPDATE insight_processing_queue
         SET insight_types = ?1, retry_count = ?2, error_message = ?3
         WHERE id = ?4",
        params![
            to_json("insight_processing_queue.insight_types", &types)?,
            retry_count,
            error_message,
            id.to_string(),
        ],
    )?;
    Ok(())
}

/// Release claims older than `cutoff` on items that neither completed nor
/// exhausted their retries. Returns the number of items released.
pub fn recover_stale_claims(conn: &Connection, cutoff: DateTime<Utc>) -> Result<usize, DatabaseError> {
    let released = conn.execute(
        "UPDATE insight_processing_queue SET started_at = NULL
         WHERE started_at IS NOT NULL AND started_at < ?1
           AND completed_at IS NULL AND retry_count < max_retries",
        params![cutoff],
    )?;
    Ok(released)
}

/// Disjoint state counts over the whole queue.
pub fn queue_counts(conn: &Connection) -> Result<QueueCounts, DatabaseError> {
    let counts = conn.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN completed_at IS NULL AND retry_count < max_retries
                              AND started_at IS NULL THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN completed_at IS NULL AND retry_count < max_retries
                              AND started_at IS NOT NULL THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN completed_at IS NOT NULL THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN completed_at IS NULL AND retry_count >= max_retries
                              THEN 1 ELSE 0 END), 0)
         FROM insight_processing_queue",
        [],
        |row| {
            Ok(QueueCounts {
                pending: row.get(0)?,
                processing: row.get(1)?,
                completed: row.get(2)?,
                failed: row.get(3)?,
            })
        },
    )?;
    Ok(counts)
}

/// Most recently created items with report and company display fields.
pub fn recent_queue_items(conn: &Connection, limit: u32) -> Result<Vec<QueueItemSummary>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {QUEUE_COLUMNS}, r.report_type, r.fiscal_year, c.name
         FROM insight_processing_queue q
         LEFT JOIN annual_reports r ON r.id = q.report_id
         LEFT JOIN companies c ON c.id = r.company_id
         ORDER BY q.created_at DESC, q.rowid DESC
         LIMIT ?1"
    ))?;
    let rows = stmt
        .query_map(params![limit], |row| {
            Ok((
                map_queue_row(row)?,
                row.get::<_, Option<String>>(11)?,
                row.get::<_, Option<i32>>(12)?,
                row.get::<_, Option<String>>(13)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(row, report_type, fiscal_year, company_name)| {
            let item = queue_item_from_row(row)?;
            Ok(QueueItemSummary {
                state: item.state(),
                item,
                report_type: report_type.unwrap_or_else(|| "Unknown".into()),
                fiscal_year,
                company_name: company_name.unwrap_or_else(|| "Unknown".into()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{seed_company, seed_report};
    use crate::db::sqlite::open_memory_database;
    use crate::models::QueueState;
    use chrono::Duration;

    fn item(report_id: Uuid, priority: i64, scheduled_for: DateTime<Utc>) -> QueueItem {
        QueueItem {
            id: Uuid::new_v4(),
            report_id,
            insight_types: vec![InsightType::FinancialAnalysis, InsightType::RiskAssessment],
            priority,
            scheduled_for,
            started_at: None,
            completed_at: None,
            retry_count: 0,
            max_retries: 3,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_and_reload_preserves_type_order() {
        let conn = open_memory_database().unwrap();
        let queued = item(Uuid::new_v4(), 1, Utc::now());
        insert_queue_item(&conn, &queued).unwrap();

        let loaded = get_queue_item(&conn, &queued.id).unwrap().unwrap();
        assert_eq!(loaded.insight_types, queued.insight_types);
        assert_eq!(loaded.state(), QueueState::Pending);
    }

    #[test]
    fn claimable_orders_by_priority_then_due_time() {
        let conn = open_memory_database().unwrap();
        let report = Uuid::new_v4();
        let now = Utc::now();
        let low = item(report, 0, now - Duration::minutes(10));
        let high_late = item(report, 5, now - Duration::minutes(1));
        let high_early = item(report, 5, now - Duration::minutes(5));
        for i in [&low, &high_late, &high_early] {
            insert_queue_item(&conn, i).unwrap();
        }

        let ids: Vec<Uuid> = select_claimable(&conn, now, 10).unwrap().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![high_early.id, high_late.id, low.id]);
    }

    #[test]
    fn future_items_are_not_claimable() {
        let conn = open_memory_database().unwrap();
        let now = Utc::now();
        insert_queue_item(&conn, &item(Uuid::new_v4(), 0, now + Duration::minutes(2))).unwrap();
        assert!(select_claimable(&conn, now, 10).unwrap().is_empty());
    }

    #[test]
    fn second_claim_loses() {
        let conn = open_memory_database().unwrap();
        let queued = item(Uuid::new_v4(), 0, Utc::now());
        insert_queue_item(&conn, &queued).unwrap();

        assert!(claim_queue_item(&conn, &queued.id, Utc::now()).unwrap());
        assert!(!claim_queue_item(&conn, &queued.id, Utc::now()).unwrap());
        assert!(select_claimable(&conn, Utc::now(), 10).unwrap().is_empty());
    }

    #[test]
    fn reschedule_returns_item_to_pending_with_narrowed_types() {
        let conn = open_memory_database().unwrap();
        let now = Utc::now();
        let queued = item(Uuid::new_v4(), 0, now);
        insert_queue_item(&conn, &queued).unwrap();
        claim_queue_item(&conn, &queued.id, now).unwrap();

        let due = now + Duration::seconds(120);
        reschedule_queue_item(&conn, &queued.id, &[InsightType::RiskAssessment], 1, due, "boom").unwrap();

        let loaded = get_queue_item(&conn, &queued.id).unwrap().unwrap();
        assert!(loaded.started_at.is_none());
        assert_eq!(loaded.retry_count, 1);
        assert_eq!(loaded.insight_types, vec![InsightType::RiskAssessment]);
        assert_eq!(loaded.error_message.as_deref(), Some("boom"));
        assert!(select_claimable(&conn, now, 10).unwrap().is_empty());
        assert_eq!(select_claimable(&conn, due, 10).unwrap().len(), 1);
    }

    #[test]
    fn counts_are_disjoint() {
        let conn = open_memory_database().unwrap();
        let now = Utc::now();
        let pending = item(Uuid::new_v4(), 0, now);
        let processing = item(Uuid::new_v4(), 0, now);
        let completed = item(Uuid::new_v4(), 0, now);
        let failed = item(Uuid::new_v4(), 0, now);
        for i in [&pending, &processing, &completed, &failed] {
            insert_queue_item(&conn, i).unwrap();
        }
        claim_queue_item(&conn, &processing.id, now).unwrap();
        claim_queue_item(&conn, &completed.id, now).unwrap();
        complete_queue_item(&conn, &completed.id, now).unwrap();
        claim_queue_item(&conn, &failed.id, now).unwrap();
        fail_queue_item(&conn, &failed.id, &[InsightType::FinancialAnalysis], 3, "gave up").unwrap();

        let counts = queue_counts(&conn).unwrap();
        assert_eq!(
            counts,
            QueueCounts { pending: 1, processing: 1, completed: 1, failed: 1 }
        );
    }

    #[test]
    fn stale_claims_are_released_but_terminal_ones_are_not() {
        let conn = open_memory_database().unwrap();
        let long_ago = Utc::now() - Duration::hours(2);
        let stuck = item(Uuid::new_v4(), 0, long_ago);
        let terminal = item(Uuid::new_v4(), 0, long_ago);
        insert_queue_item(&conn, &stuck).unwrap();
        insert_queue_item(&conn, &terminal).unwrap();
        claim_queue_item(&conn, &stuck.id, long_ago).unwrap();
        claim_queue_item(&conn, &terminal.id, long_ago).unwrap();
        fail_queue_item(&conn, &terminal.id, &[InsightType::FinancialAnalysis], 3, "x").unwrap();

        let released = recover_stale_claims(&conn, Utc::now() - Duration::minutes(30)).unwrap();
        assert_eq!(released, 1);
        let ids: Vec<Uuid> = select_claimable(&conn, Utc::now(), 10).unwrap().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![stuck.id]);
    }

    #[test]
    fn recent_items_join_display_fields() {
        let conn = open_memory_database().unwrap();
        let company = seed_company(&conn, "Acme", None);
        let report = seed_report(&conn, &company, 2023);
        insert_queue_item(&conn, &item(report.id, 0, Utc::now())).unwrap();
        insert_queue_item(&conn, &item(Uuid::new_v4(), 0, Utc::now())).unwrap();

        let recent = recent_queue_items(&conn, 50).unwrap();
        assert_eq!(recent.len(), 2);
        let known = recent.iter().find(|s| s.item.report_id == report.id).unwrap();
        assert_eq!(known.company_name, "Acme");
        assert_eq!(known.report_type, "10-K");
        let orphan = recent.iter().find(|s| s.item.report_id != report.id).unwrap();
        assert_eq!(orphan.company_name, "Unknown");
        assert_eq!(orphan.report_type, "Unknown");
    }
}
