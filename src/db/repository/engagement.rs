use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::{Engagement, EngagementAction};

/// Insert or replace the engagement of a user with an insight.
/// At most one row exists per (user, insight); the latest call wins.
pub fn upsert_engagement(
    conn: &Connection,
    user_id: &Uuid,
    insight_id: &Uuid,
    action: EngagementAction,
    duration_seconds: Option<i64>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO insight_engagements (id, user_id, insight_id, action, duration_seconds, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (user_id, insight_id) DO UPDATE SET
            action = excluded.action,
            duration_seconds = excluded.duration_seconds,
            created_at = excluded.created_at",
        params![
            Uuid::new_v4().to_string(),
            user_id.to_string(),
            insight_id.to_string(),
            action.as_str(),
            duration_seconds,
            Utc::now(),
        ],
    )?;
    Ok(())
}

pub fn get_engagement(
    conn: &Connection,
    user_id: &Uuid,
    insight_id: &Uuid,
) -> Result<Option<Engagement>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, action, duration_seconds, created_at FROM insight_engagements
             WHERE user_id = ?1 AND insight_id = ?2",
            params![user_id.to_string(), insight_id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, DateTime<Utc>>(3)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((id, action, duration_seconds, created_at)) => Ok(Some(Engagement {
            id: parse_uuid("insight_engagements.id", &id)?,
            user_id: *user_id,
            insight_id: *insight_id,
            action: action.parse()?,
            duration_seconds,
            created_at,
        })),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{seed_company, seed_report};
    use crate::db::repository::create_pending_insight;
    use crate::db::sqlite::open_memory_database;
    use crate::models::InsightType;

    #[test]
    fn repeated_views_keep_one_row_with_latest_duration() {
        let conn = open_memory_database().unwrap();
        let company = seed_company(&conn, "Acme", None);
        let report = seed_report(&conn, &company, 2023);
        let insight = create_pending_insight(&conn, &report.id, InsightType::BusinessInsights).unwrap();
        let user = Uuid::new_v4();

        upsert_engagement(&conn, &user, &insight.id, EngagementAction::View, Some(5)).unwrap();
        upsert_engagement(&conn, &user, &insight.id, EngagementAction::View, Some(42)).unwrap();

        let rows: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM insight_engagements WHERE user_id = ?1 AND insight_id = ?2",
                params![user.to_string(), insight.id.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(rows, 1);
        let stored = get_engagement(&conn, &user, &insight.id).unwrap().unwrap();
        assert_eq!(stored.duration_seconds, Some(42));
    }

    #[test]
    fn last_action_wins() {
        let conn = open_memory_database().unwrap();
        let company = seed_company(&conn, "Acme", None);
        let report = seed_report(&conn, &company, 2023);
        let insight = create_pending_insight(&conn, &report.id, InsightType::BusinessInsights).unwrap();
        let user = Uuid::new_v4();

        upsert_engagement(&conn, &user, &insight.id, EngagementAction::View, None).unwrap();
        upsert_engagement(&conn, &user, &insight.id, EngagementAction::Bookmark, None).unwrap();

        let stored = get_engagement(&conn, &user, &insight.id).unwrap().unwrap();
        assert_eq!(stored.action, EngagementAction::Bookmark);
        assert_eq!(stored.duration_seconds, None);
    }

    #[test]
    fn unknown_insight_violates_foreign_key() {
        let conn = open_memory_database().unwrap();
        let result = upsert_engagement(&conn, &Uuid::new_v4(), &Uuid::new_v4(), EngagementAction::Like, None);
        assert!(result.is_err());
    }
}
