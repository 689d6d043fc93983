//! Session token entities.
//!
//! A session token lives in two shapes: the persisted
//! [`SessionTokenRecord`] (one row per user/device pair, hash slots only)
//! and the [`UserToken`] projection handed to callers, which additionally
//! carries the raw token material the caller most recently saw or minted.

use serde::{Deserialize, Serialize};

/// Persisted session token row. One row per (user, device/session).
///
/// Both hash slots hold `SHA-256(raw_token + secret)` rendered as
/// lowercase hex; raw token material never reaches the store. `prev_auth_token`
/// equals `auth_token` on creation and is advanced to the outgoing
/// current slot on rotation, giving in-flight clients one grace slot.
///
/// All timestamps are unix seconds; `seen_at` and `revoked_at` are 0
/// while unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokenRecord {
    /// Store-assigned primary key
    pub id: i64,
    pub user_id: i64,
    /// Current hash slot
    pub auth_token: String,
    /// Previous hash slot
    pub prev_auth_token: String,
    /// Textual client IP, or empty when unknown
    pub client_ip: String,
    pub user_agent: String,
    /// True once a lookup has observed the current slot
    pub auth_token_seen: bool,
    /// Time of the most recent observation
    pub seen_at: i64,
    pub created_at: i64,
    /// Last rotation, or creation if never rotated
    pub rotated_at: i64,
    pub updated_at: i64,
    /// Soft-revoke marker; a row never transitions back to active
    pub revoked_at: i64,
}

impl SessionTokenRecord {
    /// Whether the row has been soft-revoked.
    pub fn is_revoked(&self) -> bool {
        self.revoked_at > 0
    }

    /// Flatten into the caller-facing projection, attaching the raw
    /// token material.
    pub fn into_user_token(self, unhashed_token: String) -> UserToken {
        UserToken {
            id: self.id,
            user_id: self.user_id,
            auth_token: self.auth_token,
            prev_auth_token: self.prev_auth_token,
            client_ip: self.client_ip,
            user_agent: self.user_agent,
            auth_token_seen: self.auth_token_seen,
            seen_at: self.seen_at,
            created_at: self.created_at,
            rotated_at: self.rotated_at,
            updated_at: self.updated_at,
            revoked_at: self.revoked_at,
            unhashed_token,
        }
    }
}

/// Caller-facing view of a session token.
///
/// `unhashed_token` is transient: it exists only in memory and is never
/// persisted or serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserToken {
    pub id: i64,
    pub user_id: i64,
    pub auth_token: String,
    pub prev_auth_token: String,
    pub client_ip: String,
    pub user_agent: String,
    pub auth_token_seen: bool,
    pub seen_at: i64,
    pub created_at: i64,
    pub rotated_at: i64,
    pub updated_at: i64,
    pub revoked_at: i64,
    /// Raw token material as the caller most recently saw or minted it
    #[serde(skip)]
    pub unhashed_token: String,
}

impl UserToken {
    /// Rebuild the persisted shape from this projection. The raw token
    /// material is dropped.
    pub fn to_record(&self) -> SessionTokenRecord {
        SessionTokenRecord {
            id: self.id,
            user_id: self.user_id,
            auth_token: self.auth_token.clone(),
            prev_auth_token: self.prev_auth_token.clone(),
            client_ip: self.client_ip.clone(),
            user_agent: self.user_agent.clone(),
            auth_token_seen: self.auth_token_seen,
            seen_at: self.seen_at,
            created_at: self.created_at,
            rotated_at: self.rotated_at,
            updated_at: self.updated_at,
            revoked_at: self.revoked_at,
        }
    }
}
