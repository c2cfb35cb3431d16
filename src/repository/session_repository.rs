use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use crate::domain::session::PersistedSession;

/// Durable storage for the authentication session. Injected into the auth
/// store so the store itself stays free of I/O decisions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    async fn load(&self) -> Result<Option<PersistedSession>>;
    async fn save(&self, session: &PersistedSession) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct SessionRepository {
    pool: Arc<SqlitePool>,
}

impl SessionRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionPersistence for SessionRepository {
    async fn load(&self) -> Result<Option<PersistedSession>> {
        let record = sqlx::query(
            r#"
            SELECT token, username, user_id, expires_at, active_sessions
            FROM auth_session
            WHERE id = 1
            "#,
        )
        .fetch_optional(&*self.pool)
        .await?;

        let Some(row) = record else {
            return Ok(None);
        };

        let expires_at = row
            .get::<Option<String>, _>("expires_at")
            .map(|s| DateTime::parse_from_rfc3339(&s).map(|d| d.with_timezone(&Utc)))
            .transpose()?;

        Ok(Some(PersistedSession {
            token: row.get("token"),
            username: row.get("username"),
            user_id: row.get("user_id"),
            expires_at,
            active_sessions: row.get::<i64, _>("active_sessions").max(0) as u32,
        }))
    }

    async fn save(&self, session: &PersistedSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_session (id, token, username, user_id, expires_at, active_sessions, updated_at)
            VALUES (1, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                token = excluded.token,
                username = excluded.username,
                user_id = excluded.user_id,
                expires_at = excluded.expires_at,
                active_sessions = excluded.active_sessions,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&session.token)
        .bind(&session.username)
        .bind(session.user_id)
        .bind(session.expires_at.map(|d| d.to_rfc3339()))
        .bind(i64::from(session.active_sessions))
        .bind(Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await?;

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        // The pomodoro counter outlives a logout
        sqlx::query(
            r#"
            UPDATE auth_session
            SET token = NULL, username = NULL, user_id = NULL, expires_at = NULL, updated_at = ?
            WHERE id = 1
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await?;

        Ok(())
    }
}
