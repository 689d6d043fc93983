//! Session token service module
//!
//! This module handles the lifecycle of user session tokens:
//! - Issuance of raw token material and hashed persistence
//! - The hot lookup path with its process-local cache
//! - The rotation state machine (current + previous hash slots)
//! - Revocation, listing and periodic cleanup

mod cache;
mod cleanup;
mod clock;
mod config;
mod rotation;
mod service;

#[cfg(test)]
mod tests;

pub use cache::{cache_key, CachedToken, TokenLookupCache, CACHE_TTL};
pub use cleanup::{TokenCleanupConfig, TokenCleanupService};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TokenServiceConfig;
pub use rotation::{RotationPolicy, SELF_RACE_GUARD_SECS, URGENT_ROTATE_INTERVAL_SECS};
pub use service::{hash_token, ActiveTokenService, TokenService};
