use async_trait::async_trait;
use sqlx::SqlitePool;

use super::SessionResolver;
use crate::error::AppResult;
use crate::types::UserId;

/// Reads sessions written by the login service.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionResolver for SqliteSessionStore {
    async fn resolve(&self, session_token: &str) -> AppResult<Option<UserId>> {
        let user_id: Option<i64> = sqlx::query_scalar(
            "SELECT user_id FROM sessions \
             WHERE token = ?1 AND (expires_at IS NULL OR expires_at > strftime('%Y-%m-%dT%H:%M:%SZ','now'))",
        )
        .bind(session_token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user_id.map(UserId))
    }
}
