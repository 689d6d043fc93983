//! MySQL implementation of the TokenRepository trait.
//!
//! Every guarded mutation is a single conditional `UPDATE`; the WHERE
//! clause is the synchronization primitive. Racing writers are serialized
//! by the database and losers observe zero affected rows, which callers
//! treat as benign.

use async_trait::async_trait;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::debug;

use sessiond_core::domain::entities::token::SessionTokenRecord;
use sessiond_core::errors::TokenError;
use sessiond_core::repositories::{TokenRepository, TokenRotation};

/// MySQL implementation of TokenRepository
pub struct MySqlTokenRepository {
    pool: MySqlPool,
}

impl MySqlTokenRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

const COLUMNS: &str = "id, user_id, auth_token, prev_auth_token, client_ip, user_agent, \
     auth_token_seen, seen_at, created_at, rotated_at, updated_at, revoked_at";

fn row_to_record(row: &MySqlRow) -> Result<SessionTokenRecord, sqlx::Error> {
    Ok(SessionTokenRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        auth_token: row.try_get("auth_token")?,
        prev_auth_token: row.try_get("prev_auth_token")?,
        client_ip: row.try_get("client_ip")?,
        user_agent: row.try_get("user_agent")?,
        auth_token_seen: row.try_get("auth_token_seen")?,
        seen_at: row.try_get("seen_at")?,
        created_at: row.try_get("created_at")?,
        rotated_at: row.try_get("rotated_at")?,
        updated_at: row.try_get("updated_at")?,
        revoked_at: row.try_get("revoked_at")?,
    })
}

fn store_err(e: sqlx::Error) -> TokenError {
    TokenError::StoreUnavailable {
        reason: e.to_string(),
    }
}

#[async_trait]
impl TokenRepository for MySqlTokenRepository {
    async fn insert_token(
        &self,
        mut record: SessionTokenRecord,
    ) -> Result<SessionTokenRecord, TokenError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_session_token (
                user_id, auth_token, prev_auth_token, client_ip, user_agent,
                auth_token_seen, seen_at, created_at, rotated_at, updated_at, revoked_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.user_id)
        .bind(&record.auth_token)
        .bind(&record.prev_auth_token)
        .bind(&record.client_ip)
        .bind(&record.user_agent)
        .bind(record.auth_token_seen)
        .bind(record.seen_at)
        .bind(record.created_at)
        .bind(record.rotated_at)
        .bind(record.updated_at)
        .bind(record.revoked_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        record.id = result.last_insert_id() as i64;
        Ok(record)
    }

    async fn find_by_hash(&self, hashed: &str) -> Result<Option<SessionTokenRecord>, TokenError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM user_session_token \
             WHERE auth_token = ? OR prev_auth_token = ? LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(hashed)
            .bind(hashed)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        row.as_ref().map(row_to_record).transpose().map_err(store_err)
    }

    async fn find_by_id(
        &self,
        user_id: i64,
        token_id: i64,
    ) -> Result<Option<SessionTokenRecord>, TokenError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM user_session_token WHERE id = ? AND user_id = ?"
        );
        let row = sqlx::query(&sql)
            .bind(token_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        row.as_ref().map(row_to_record).transpose().map_err(store_err)
    }

    async fn find_active_by_user(
        &self,
        user_id: i64,
        created_after: i64,
        rotated_after: i64,
    ) -> Result<Vec<SessionTokenRecord>, TokenError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM user_session_token \
             WHERE user_id = ? AND created_at > ? AND rotated_at > ? AND revoked_at = 0"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(created_after)
            .bind(rotated_after)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        rows.iter()
            .map(row_to_record)
            .collect::<Result<_, _>>()
            .map_err(store_err)
    }

    async fn find_revoked_by_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<SessionTokenRecord>, TokenError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM user_session_token WHERE user_id = ? AND revoked_at > 0"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        rows.iter()
            .map(row_to_record)
            .collect::<Result<_, _>>()
            .map_err(store_err)
    }

    async fn mark_current_seen(
        &self,
        token_id: i64,
        hashed: &str,
        seen_at: i64,
    ) -> Result<u64, TokenError> {
        let result = sqlx::query(
            "UPDATE user_session_token SET auth_token_seen = ?, seen_at = ? \
             WHERE id = ? AND auth_token = ?",
        )
        .bind(true)
        .bind(seen_at)
        .bind(token_id)
        .bind(hashed)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected())
    }

    async fn reset_previous_seen(
        &self,
        token_id: i64,
        prev_hashed: &str,
        rotated_before: i64,
    ) -> Result<u64, TokenError> {
        let result = sqlx::query(
            "UPDATE user_session_token SET auth_token_seen = ? \
             WHERE id = ? AND prev_auth_token = ? AND rotated_at < ?",
        )
        .bind(false)
        .bind(token_id)
        .bind(prev_hashed)
        .bind(rotated_before)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected())
    }

    async fn rotate(&self, rotation: TokenRotation) -> Result<u64, TokenError> {
        // auth_token_seen must be assigned after the CASE that reads it:
        // MySQL evaluates SET clauses left to right using already-updated
        // values.
        let sql = r#"
            UPDATE user_session_token
            SET
                seen_at = 0,
                user_agent = ?,
                client_ip = ?,
                prev_auth_token = CASE WHEN auth_token_seen = ? THEN auth_token ELSE prev_auth_token END,
                auth_token = ?,
                auth_token_seen = ?,
                rotated_at = ?
            WHERE id = ? AND (auth_token_seen = ? OR rotated_at < ?)
        "#;

        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let result = sqlx::query(sql)
            .bind(&rotation.user_agent)
            .bind(&rotation.client_ip)
            .bind(true)
            .bind(&rotation.new_hashed_token)
            .bind(false)
            .bind(rotation.rotated_at)
            .bind(rotation.token_id)
            .bind(true)
            .bind(rotation.race_guard_before)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        tx.commit().await.map_err(store_err)?;

        debug!(
            affected = result.rows_affected(),
            token_id = rotation.token_id,
            "session token rotation statement executed"
        );

        Ok(result.rows_affected())
    }

    async fn soft_revoke(&self, token_id: i64, revoked_at: i64) -> Result<u64, TokenError> {
        let result = sqlx::query(
            "UPDATE user_session_token SET revoked_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(revoked_at)
        .bind(revoked_at)
        .bind(token_id)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected())
    }

    async fn delete_token(&self, token_id: i64) -> Result<u64, TokenError> {
        let result = sqlx::query("DELETE FROM user_session_token WHERE id = ?")
            .bind(token_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(result.rows_affected())
    }

    async fn delete_user_tokens(&self, user_id: i64) -> Result<u64, TokenError> {
        let result = sqlx::query("DELETE FROM user_session_token WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        debug!(
            user_id,
            count = result.rows_affected(),
            "all session tokens for user deleted"
        );

        Ok(result.rows_affected())
    }

    async fn delete_tokens_for_users(&self, user_ids: &[i64]) -> Result<u64, TokenError> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; user_ids.len()].join(",");
        let sql = format!("DELETE FROM user_session_token WHERE user_id IN ({placeholders})");

        let mut query = sqlx::query(&sql);
        for user_id in user_ids {
            query = query.bind(*user_id);
        }

        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let result = query.execute(&mut *tx).await.map_err(store_err)?;
        tx.commit().await.map_err(store_err)?;

        debug!(
            users = user_ids.len(),
            count = result.rows_affected(),
            "all session tokens for given users deleted"
        );

        Ok(result.rows_affected())
    }

    async fn count_active(
        &self,
        created_after: i64,
        rotated_after: i64,
    ) -> Result<i64, TokenError> {
        let row = sqlx::query(
            "SELECT COUNT(*) FROM user_session_token \
             WHERE created_at > ? AND rotated_at > ? AND revoked_at = 0",
        )
        .bind(created_after)
        .bind(rotated_after)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        row.try_get(0).map_err(store_err)
    }

    async fn delete_expired(
        &self,
        created_before: i64,
        rotated_before: i64,
    ) -> Result<u64, TokenError> {
        let result = sqlx::query(
            "DELETE FROM user_session_token WHERE created_at <= ? OR rotated_at <= ?",
        )
        .bind(created_before)
        .bind(rotated_before)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected())
    }
}
