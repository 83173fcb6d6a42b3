use chrono::{DateTime, Utc};
use sqlx::Row;

use shopbot_core::domain::session::{UserId, UserSession};

use super::{RepositoryError, SessionRepository};
use crate::DbPool;

pub struct SqlSessionRepository {
    pool: DbPool,
}

impl SqlSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<UserSession, RepositoryError> {
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let dialogue_state: Option<String> =
        row.try_get("dialogue_state").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let last_seen_at_str: String =
        row.try_get("last_seen_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let last_seen_at = DateTime::parse_from_rfc3339(&last_seen_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(UserSession { user_id: UserId(user_id), dialogue_state, last_seen_at })
}

#[async_trait::async_trait]
impl SessionRepository for SqlSessionRepository {
    async fn find(&self, user_id: &UserId) -> Result<Option<UserSession>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, dialogue_state, last_seen_at FROM sessions WHERE user_id = ?",
        )
        .bind(&user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_session(r)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, session: UserSession) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO sessions (user_id, dialogue_state, last_seen_at)
             VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                 dialogue_state = excluded.dialogue_state,
                 last_seen_at = excluded.last_seen_at",
        )
        .bind(&session.user_id.0)
        .bind(&session.dialogue_state)
        .bind(session.last_seen_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_state(
        &self,
        user_id: &UserId,
        state: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE sessions SET dialogue_state = ? WHERE user_id = ?")
            .bind(state)
            .bind(&user_id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
