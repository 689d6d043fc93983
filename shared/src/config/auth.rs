//! Session token configuration

use serde::{Deserialize, Serialize};

/// Session token lifetimes, rotation cadence and the hash secret.
///
/// The secret key is mixed into every token hash; rotating it invalidates
/// all outstanding session tokens.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Server secret key entered into the token hash
    pub secret_key: String,

    /// Absolute token lifetime in seconds, measured from creation
    pub login_max_lifetime: i64,

    /// Maximum inactivity in seconds, measured from the last rotation
    pub login_max_inactive_lifetime: i64,

    /// Normal-case rotation cadence in minutes
    #[serde(default = "default_rotation_interval_minutes")]
    pub token_rotation_interval_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: String::from("change-me-in-production"),
            login_max_lifetime: 30 * 24 * 60 * 60, // 30 days
            login_max_inactive_lifetime: 7 * 24 * 60 * 60, // 7 days
            token_rotation_interval_minutes: default_rotation_interval_minutes(),
        }
    }
}

impl AuthConfig {
    /// Create a new configuration with the given secret key
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            ..Default::default()
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let secret_key =
            std::env::var("SESSION_SECRET_KEY").unwrap_or(defaults.secret_key);
        let login_max_lifetime = std::env::var("LOGIN_MAX_LIFETIME")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.login_max_lifetime);
        let login_max_inactive_lifetime = std::env::var("LOGIN_MAX_INACTIVE_LIFETIME")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.login_max_inactive_lifetime);
        let token_rotation_interval_minutes =
            std::env::var("TOKEN_ROTATION_INTERVAL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.token_rotation_interval_minutes);

        Self {
            secret_key,
            login_max_lifetime,
            login_max_inactive_lifetime,
            token_rotation_interval_minutes,
        }
    }

    /// Set the absolute lifetime in days
    pub fn with_max_lifetime_days(mut self, days: i64) -> Self {
        self.login_max_lifetime = days * 86400;
        self
    }

    /// Set the inactivity lifetime in days
    pub fn with_max_inactive_lifetime_days(mut self, days: i64) -> Self {
        self.login_max_inactive_lifetime = days * 86400;
        self
    }

    /// Set the rotation cadence in minutes
    pub fn with_rotation_interval_minutes(mut self, minutes: i64) -> Self {
        self.token_rotation_interval_minutes = minutes;
        self
    }

    /// Check if using the default secret (security warning)
    pub fn is_using_default_secret(&self) -> bool {
        self.secret_key == "change-me-in-production"
    }
}

fn default_rotation_interval_minutes() -> i64 {
    10
}
