//! Error type definitions for token issuance, lookup, rotation and the
//! upstream OAuth refresh.
//!
//! Benign "zero rows affected" outcomes of conditional updates are never
//! errors; they signal that a concurrent actor already performed the
//! intended change.

use std::sync::Arc;

use thiserror::Error;

/// Session token errors surfaced by the token service.
#[derive(Error, Debug)]
pub enum TokenError {
    /// No row matches the presented token hash, or a revoke target is
    /// absent.
    #[error("user session token not found")]
    NotFound,

    /// The row exists but has been soft-revoked. Carries the ids for
    /// auditing.
    #[error("user session token revoked (user {user_id}, token {token_id})")]
    Revoked { user_id: i64, token_id: i64 },

    /// Lifetime or inactivity threshold exceeded.
    #[error("user session token expired (user {user_id}, token {token_id})")]
    Expired { user_id: i64, token_id: i64 },

    /// The upstream OAuth refresh permanently failed; the bound session
    /// token has been revoked.
    #[error("oauth access token could not be refreshed")]
    ExpiredAccessToken(#[source] Arc<RefreshError>),

    /// The CSPRNG failed while minting token material.
    #[error("random source failure: {reason}")]
    RandomSource { reason: String },

    /// Persistence I/O failure. Retries are safe; policy is left to the
    /// caller.
    #[error("token store unavailable: {reason}")]
    StoreUnavailable { reason: String },
}

/// Failures of the upstream OAuth token refresh.
#[derive(Error, Debug)]
pub enum RefreshError {
    /// The refresh was cancelled before completing. Treated as benign:
    /// the owning request already aborted for orthogonal reasons.
    #[error("refresh cancelled")]
    Cancelled,

    #[error("refresh timed out after {seconds}s")]
    TimedOut { seconds: u64 },

    /// The provider rejected the refresh (revoked grant, invalid token).
    #[error("upstream provider rejected the refresh: {reason}")]
    Upstream { reason: String },
}
