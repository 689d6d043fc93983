//! Token repository trait defining the interface for session token
//! persistence.
//!
//! The contract leans on conditional single-statement updates as the only
//! synchronization primitive: every mutating method that races with
//! concurrent actors takes its guard columns as parameters and reports the
//! number of affected rows. Zero affected rows means a concurrent actor
//! won the race and is never an error.

use async_trait::async_trait;

use crate::domain::entities::token::SessionTokenRecord;
use crate::errors::TokenError;

/// Parameters for the conditional rotation statement.
///
/// The statement must advance `prev_auth_token` to the outgoing current
/// slot **only** when `auth_token_seen` is true, and must match only rows
/// where `auth_token_seen` is true or `rotated_at` is older than
/// `race_guard_before`, so two near-simultaneous rotations cannot both
/// win.
#[derive(Debug, Clone)]
pub struct TokenRotation {
    pub token_id: i64,
    /// Hash destined for the current slot
    pub new_hashed_token: String,
    pub client_ip: String,
    pub user_agent: String,
    /// New `rotated_at` value (also clears `seen_at`)
    pub rotated_at: i64,
    /// Rows last rotated before this instant may rotate even when unseen
    pub race_guard_before: i64,
}

/// Repository trait for session token persistence.
///
/// Implementations must express each conditional mutation as a single
/// statement so the store serializes racing writers; no read-modify-write
/// under an application lock.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Persist a freshly minted token row.
    ///
    /// # Returns
    /// * `Ok(SessionTokenRecord)` - The stored row with its assigned id
    /// * `Err(TokenError)` - Persistence failed
    async fn insert_token(
        &self,
        record: SessionTokenRecord,
    ) -> Result<SessionTokenRecord, TokenError>;

    /// Find the row whose current **or** previous slot equals `hashed`.
    async fn find_by_hash(
        &self,
        hashed: &str,
    ) -> Result<Option<SessionTokenRecord>, TokenError>;

    /// Find a token row by id, scoped to its owning user.
    async fn find_by_id(
        &self,
        user_id: i64,
        token_id: i64,
    ) -> Result<Option<SessionTokenRecord>, TokenError>;

    /// All non-revoked rows of `user_id` created after `created_after`
    /// and rotated after `rotated_after`.
    async fn find_active_by_user(
        &self,
        user_id: i64,
        created_after: i64,
        rotated_after: i64,
    ) -> Result<Vec<SessionTokenRecord>, TokenError>;

    /// All soft-revoked rows of `user_id`.
    async fn find_revoked_by_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<SessionTokenRecord>, TokenError>;

    /// Mark the current slot as observed.
    ///
    /// Guarded by `WHERE id = ? AND auth_token = ?`; a concurrent rotation
    /// makes the guard miss, which callers treat as benign.
    ///
    /// # Returns
    /// Number of affected rows (0 or 1).
    async fn mark_current_seen(
        &self,
        token_id: i64,
        hashed: &str,
        seen_at: i64,
    ) -> Result<u64, TokenError>;

    /// Re-open the observation window after a previous-slot sighting:
    /// clear `auth_token_seen`, but only for rows whose `rotated_at` is
    /// older than `rotated_before` and whose previous slot still equals
    /// `prev_hashed`.
    ///
    /// # Returns
    /// Number of affected rows (0 or 1).
    async fn reset_previous_seen(
        &self,
        token_id: i64,
        prev_hashed: &str,
        rotated_before: i64,
    ) -> Result<u64, TokenError>;

    /// Execute the conditional rotation statement described on
    /// [`TokenRotation`].
    ///
    /// # Returns
    /// Number of affected rows; 0 means a concurrent rotation won.
    async fn rotate(&self, rotation: TokenRotation) -> Result<u64, TokenError>;

    /// Soft-revoke: set `revoked_at`. The row stays queryable for audit.
    async fn soft_revoke(&self, token_id: i64, revoked_at: i64) -> Result<u64, TokenError>;

    /// Hard-revoke: delete the row.
    async fn delete_token(&self, token_id: i64) -> Result<u64, TokenError>;

    /// Delete every token row of `user_id`.
    async fn delete_user_tokens(&self, user_id: i64) -> Result<u64, TokenError>;

    /// Delete every token row of each listed user, transactionally.
    /// An empty list is a no-op.
    async fn delete_tokens_for_users(&self, user_ids: &[i64]) -> Result<u64, TokenError>;

    /// Count non-revoked rows created after `created_after` and rotated
    /// after `rotated_after`.
    async fn count_active(
        &self,
        created_after: i64,
        rotated_after: i64,
    ) -> Result<i64, TokenError>;

    /// Delete rows that fell out of both lifetime windows: created at or
    /// before `created_before`, or last rotated at or before
    /// `rotated_before`.
    async fn delete_expired(
        &self,
        created_before: i64,
        rotated_before: i64,
    ) -> Result<u64, TokenError>;
}
