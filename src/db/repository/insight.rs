use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{parse_json, parse_uuid, to_json};
use crate::db::DatabaseError;
use crate::models::{GeneratedInsight, Insight, InsightType, ProcessingStatus};

const INSIGHT_COLUMNS: &str = "id, report_id, insight_type, title, content, summary, key_metrics,
    confidence_score, processing_status, model_used, tokens_used, processing_time_ms,
    error_message, created_at, updated_at";

pub fn insert_insight(conn: &Connection, insight: &Insight) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO ai_insights ({INSIGHT_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"),
        params![
            insight.id.to_string(),
            insight.report_id.to_string(),
            insight.insight_type.as_str(),
            insight.title,
            insight.content,
            insight.summary,
            to_json("ai_insights.key_metrics", &insight.key_metrics)?,
            insight.confidence_score,
            insight.processing_status.as_str(),
            insight.model_used,
            insight.tokens_used,
            insight.processing_time_ms,
            insight.error_message,
            insight.created_at,
            insight.updated_at,
        ],
    )?;
    Ok(())
}

/// Create a `pending` row for one generation attempt.
pub fn create_pending_insight(
    conn: &Connection,
    report_id: &Uuid,
    insight_type: InsightType,
) -> Result<Insight, DatabaseError> {
    let now = Utc::now();
    let insight = Insight {
        id: Uuid::new_v4(),
        report_id: *report_id,
        insight_type,
        title: insight_type.default_title(),
        content: String::new(),
        summary: String::new(),
        key_metrics: serde_json::Map::new(),
        confidence_score: 0.0,
        processing_status: ProcessingStatus::Pending,
        model_used: None,
        tokens_used: 0,
        processing_time_ms: 0,
        error_message: None,
        created_at: now,
        updated_at: now,
    };
    insert_insight(conn, &insight)?;
    Ok(insight)
}

fn transition_error(id: &Uuid, to: ProcessingStatus) -> DatabaseError {
    DatabaseError::InvalidTransition {
        entity_type: "Insight".into(),
        id: id.to_string(),
        to: to.as_str().into(),
    }
}

/// pending → processing
pub fn mark_insight_processing(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE ai_insights SET processing_status = 'processing', updated_at = ?1
         WHERE id = ?2 AND processing_status = 'pending'",
        params![Utc::now(), id.to_string()],
    )?;
    if updated == 0 {
        return Err(transition_error(id, ProcessingStatus::Processing));
    }
    Ok(())
}

/// processing → completed, storing the parsed fields.
pub fn complete_insight(
    conn: &Connection,
    id: &Uuid,
    generated: &GeneratedInsight,
    model_used: &str,
    tokens_used: u32,
    processing_time_ms: u64,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE ai_insights
         SET processing_status = 'completed', title = ?1, content = ?2, summary = ?3,
             key_metrics = ?4, confidence_score = ?5, model_used = ?6, tokens_used = ?7,
             processing_time_ms = ?8, error_message = NULL, updated_at = ?9
         WHERE id = ?10 AND processing_status = 'processing'",
        params![
            generated.title,
            generated.content,
            generated.summary,
            to_json("ai_insights.key_metrics", &generated.key_metrics)?,
            generated.confidence_score,
            model_used,
            tokens_used,
            processing_time_ms,
            Utc::now(),
            id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(transition_error(id, ProcessingStatus::Completed));
    }
    Ok(())
}

/// pending|processing → failed, replacing the body with a failure placeholder.
pub fn fail_insight(
    conn: &Connection,
    id: &Uuid,
    insight_type: InsightType,
    error_message: &str,
    processing_time_ms: u64,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE ai_insights
         SET processing_status = 'failed', title = ?1, content = ?2, summary = ?3,
             key_metrics = '{}', confidence_score = 0, error_message = ?4,
             processing_time_ms = ?5, updated_at = ?6
         WHERE id = ?7 AND processing_status IN ('pending', 'processing')",
        params![
            format!("Failed to generate {}", insight_type.as_str()),
            "Analysis failed due to processing error.",
            "Processing failed",
            error_message,
            processing_time_ms,
            Utc::now(),
            id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(transition_error(id, ProcessingStatus::Failed));
    }
    Ok(())
}

struct InsightRow {
    id: String,
    report_id: String,
    insight_type: String,
    title: String,
    content: String,
    summary: String,
    key_metrics: String,
    confidence_score: f64,
    processing_status: String,
    model_used: Option<String>,
    tokens_used: u32,
    processing_time_ms: u64,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn map_insight_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<InsightRow> {
    Ok(InsightRow {
        id: row.get(0)?,
        report_id: row.get(1)?,
        insight_type: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        summary: row.get(5)?,
        key_metrics: row.get(6)?,
        confidence_score: row.get(7)?,
        processing_status: row.get(8)?,
        model_used: row.get(9)?,
        tokens_used: row.get(10)?,
        processing_time_ms: row.get(11)?,
        error_message: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn insight_from_row(row: InsightRow) -> Result<Insight, DatabaseError> {
    Ok(Insight {
        id: parse_uuid("ai_insights.id", &row.id)?,
        report_id: parse_uuid("ai_insights.report_id", &row.report_id)?,
        insight_type: InsightType::parse_lenient(&row.insight_type),
        title: row.title,
        content: row.content,
        summary: row.summary,
        key_metrics: parse_json("ai_insights.key_metrics", &row.key_metrics)?,
        confidence_score: row.confidence_score,
        processing_status: row.processing_status.parse()?,
        model_used: row.model_used,
        tokens_used: row.tokens_used,
        processing_time_ms: row.processing_time_ms,
        error_message: row.error_message,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

pub fn get_insight(conn: &Connection, id: &Uuid) -> Result<Option<Insight>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {INSIGHT_COLUMNS} FROM ai_insights WHERE id = ?1"),
            params![id.to_string()],
            map_insight_row,
        )
        .optional()?;
    row.map(insight_from_row).transpose()
}

/// All insights of a report, oldest first.
pub fn list_insights_for_report(conn: &Connection, report_id: &Uuid) -> Result<Vec<Insight>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INSIGHT_COLUMNS} FROM ai_insights WHERE report_id = ?1
         ORDER BY created_at ASC, rowid ASC"
    ))?;
    let rows = stmt
        .query_map(params![report_id.to_string()], map_insight_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(insight_from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{seed_company, seed_report};
    use crate::db::sqlite::open_memory_database;

    fn generated() -> GeneratedInsight {
        let mut metrics = serde_json::Map::new();
        metrics.insert("revenue_growth".into(), serde_json::json!("12%"));
        GeneratedInsight {
            title: "Strong year".into(),
            content: "Revenue grew.".into(),
            summary: "Growth".into(),
            key_metrics: metrics,
            confidence_score: 0.85,
        }
    }

    #[test]
    fn pending_processing_completed_lifecycle() {
        let conn = open_memory_database().unwrap();
        let company = seed_company(&conn, "Acme", None);
        let report = seed_report(&conn, &company, 2023);

        let insight = create_pending_insight(&conn, &report.id, InsightType::FinancialAnalysis).unwrap();
        mark_insight_processing(&conn, &insight.id).unwrap();
        complete_insight(&conn, &insight.id, &generated(), "test-model", 1200, 35).unwrap();

        let stored = get_insight(&conn, &insight.id).unwrap().unwrap();
        assert_eq!(stored.processing_status, ProcessingStatus::Completed);
        assert_eq!(stored.title, "Strong year");
        assert_eq!(stored.key_metrics["revenue_growth"], "12%");
        assert_eq!(stored.tokens_used, 1200);
        assert_eq!(stored.model_used.as_deref(), Some("test-model"));
    }

    #[test]
    fn completed_insight_cannot_fail_afterwards() {
        let conn = open_memory_database().unwrap();
        let company = seed_company(&conn, "Acme", None);
        let report = seed_report(&conn, &company, 2023);

        let insight = create_pending_insight(&conn, &report.id, InsightType::RiskAssessment).unwrap();
        mark_insight_processing(&conn, &insight.id).unwrap();
        complete_insight(&conn, &insight.id, &generated(), "m", 1, 1).unwrap();

        let err = fail_insight(&conn, &insight.id, InsightType::RiskAssessment, "late", 1).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidTransition { .. }));
        let err = mark_insight_processing(&conn, &insight.id).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidTransition { .. }));
    }

    #[test]
    fn completion_requires_processing_state() {
        let conn = open_memory_database().unwrap();
        let company = seed_company(&conn, "Acme", None);
        let report = seed_report(&conn, &company, 2023);

        let insight = create_pending_insight(&conn, &report.id, InsightType::RiskAssessment).unwrap();
        let err = complete_insight(&conn, &insight.id, &generated(), "m", 1, 1).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidTransition { .. }));
    }

    #[test]
    fn failed_insight_gets_placeholder_body() {
        let conn = open_memory_database().unwrap();
        let company = seed_company(&conn, "Acme", None);
        let report = seed_report(&conn, &company, 2023);

        let insight = create_pending_insight(&conn, &report.id, InsightType::EsgAnalysis).unwrap();
        mark_insight_processing(&conn, &insight.id).unwrap();
        fail_insight(&conn, &insight.id, InsightType::EsgAnalysis, "model down", 12).unwrap();

        let stored = get_insight(&conn, &insight.id).unwrap().unwrap();
        assert_eq!(stored.processing_status, ProcessingStatus::Failed);
        assert_eq!(stored.title, "Failed to generate esg_analysis");
        assert_eq!(stored.summary, "Processing failed");
        assert_eq!(stored.error_message.as_deref(), Some("model down"));
        assert_eq!(stored.confidence_score, 0.0);
    }

    #[test]
    fn list_for_report_preserves_creation_order() {
        let conn = open_memory_database().unwrap();
        let company = seed_company(&conn, "Acme", None);
        let report = seed_report(&conn, &company, 2023);

        create_pending_insight(&conn, &report.id, InsightType::MarketAnalysis).unwrap();
        create_pending_insight(&conn, &report.id, InsightType::ExecutiveSummary).unwrap();

        let listed = list_insights_for_report(&conn, &report.id).unwrap();
        let types: Vec<_> = listed.iter().map(|i| i.insight_type).collect();
        assert_eq!(types, vec![InsightType::MarketAnalysis, InsightType::ExecutiveSummary]);
    }
}
