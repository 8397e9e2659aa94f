use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use super::CredentialStore;
use crate::error::{AppError, AppResult};
use crate::types::{Credential, UserId};

const COLUMNS: &str = "id, user_id, title, token, is_connected, created_at";

#[derive(Clone)]
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_row(row: &sqlx::sqlite::SqliteRow) -> Result<Credential, sqlx::Error> {
    Ok(Credential {
        id: row.try_get("id")?,
        user_id: UserId(row.try_get("user_id")?),
        title: row.try_get("title")?,
        token: row.try_get("token")?,
        is_connected: row.try_get::<i64, _>("is_connected")? != 0,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn list(&self, user: UserId) -> AppResult<Vec<Credential>> {
        let rows = sqlx::query(&format!("SELECT {} FROM credentials WHERE user_id = ?1 ORDER BY id", COLUMNS))
            .bind(user.0)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(map_row).collect::<Result<_, _>>()?)
    }

    async fn list_connected(&self, user: UserId) -> AppResult<Vec<Credential>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM credentials WHERE user_id = ?1 AND is_connected = 1 ORDER BY id",
            COLUMNS
        ))
        .bind(user.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(map_row).collect::<Result<_, _>>()?)
    }

    async fn find(&self, user: UserId, token: &str) -> AppResult<Option<Credential>> {
        let row = sqlx::query(&format!("SELECT {} FROM credentials WHERE user_id = ?1 AND token = ?2", COLUMNS))
            .bind(user.0)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(map_row).transpose()?)
    }

    async fn add(&self, user: UserId, title: &str, token: &str) -> AppResult<Credential> {
        let res = sqlx::query(&format!(
            "INSERT INTO credentials (user_id, title, token, is_connected) VALUES (?1, ?2, ?3, 0) RETURNING {}",
            COLUMNS
        ))
        .bind(user.0)
        .bind(title)
        .bind(token)
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(row) => Ok(map_row(&row)?),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::Conflict("credential is already linked".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn set_connected(&self, user: UserId, token: &str, connected: bool) -> AppResult<bool> {
        let res = sqlx::query("UPDATE credentials SET is_connected = ?3 WHERE user_id = ?1 AND token = ?2")
            .bind(user.0)
            .bind(token)
            .bind(connected as i64)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete(&self, user: UserId, token: &str) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM credentials WHERE user_id = ?1 AND token = ?2")
            .bind(user.0)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
