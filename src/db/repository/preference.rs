use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{parse_json, to_json};
use crate::db::DatabaseError;
use crate::models::UserProfile;

pub fn get_user_profile(conn: &Connection, user_id: &Uuid) -> Result<Option<UserProfile>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT interests, updated_at FROM user_profiles WHERE user_id = ?1",
            params![user_id.to_string()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, DateTime<Utc>>(1)?)),
        )
        .optional()?;

    match row {
        Some((interests, updated_at)) => Ok(Some(UserProfile {
            user_id: *user_id,
            interests: parse_json("user_profiles.interests", &interests)?,
            updated_at,
        })),
        None => Ok(None),
    }
}

/// Interest list of a user; empty when the user has no profile.
pub fn get_user_interests(conn: &Connection, user_id: &Uuid) -> Result<Vec<String>, DatabaseError> {
    Ok(get_user_profile(conn, user_id)?
        .map(|p| p.interests)
        .unwrap_or_default())
}

pub fn set_user_interests(
    conn: &Connection,
    user_id: &Uuid,
    interests: &[String],
) -> Result<UserProfile, DatabaseError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO user_profiles (user_id, interests, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT (user_id) DO UPDATE SET interests = excluded.interests, updated_at = excluded.updated_at",
        params![user_id.to_string(), to_json("user_profiles.interests", &interests)?, now],
    )?;
    Ok(UserProfile {
        user_id: *user_id,
        interests: interests.to_vec(),
        updated_at: now,
    })
}
