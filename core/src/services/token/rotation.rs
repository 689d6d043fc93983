//! Rotation policy: when a session token is due for replacement.

use chrono::{DateTime, Duration, Utc};

use crate::domain::entities::token::SessionTokenRecord;

/// Grace window in seconds for rotating tokens that were minted but never
/// observed, and for re-opening previous-slot observation after a
/// rotation.
pub const URGENT_ROTATE_INTERVAL_SECS: i64 = 60;

/// Guard window in seconds in the rotation statement preventing two
/// near-simultaneous rotations from both winning.
pub const SELF_RACE_GUARD_SECS: i64 = 30;

/// Decides when a token row is due for rotation.
///
/// A token whose current slot has been observed rotates on the configured
/// cadence. An unseen token rotates urgently once the 60 second grace
/// passes: it was minted but the client never presented it, so it must be
/// replaced rather than trusted.
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    rotation_interval: Duration,
}

impl RotationPolicy {
    pub fn new(rotation_interval_minutes: i64) -> Self {
        Self {
            rotation_interval: Duration::minutes(rotation_interval_minutes),
        }
    }

    pub fn needs_rotation(&self, record: &SessionTokenRecord, now: DateTime<Utc>) -> bool {
        if record.auth_token_seen {
            record.rotated_at < (now - self.rotation_interval).timestamp()
        } else {
            record.rotated_at < now.timestamp() - URGENT_ROTATE_INTERVAL_SECS
        }
    }
}
