//! Configuration for the token service

use sessiond_shared::config::auth::AuthConfig;

/// Configuration for the token service
#[derive(Debug, Clone)]
pub struct TokenServiceConfig {
    /// Secret mixed into the token hash. Process-wide; rotating it
    /// invalidates all outstanding tokens.
    pub secret_key: String,
    /// Absolute token lifetime in seconds from creation
    pub max_lifetime: i64,
    /// Maximum seconds since the last rotation
    pub max_inactive_lifetime: i64,
    /// Normal-case rotation cadence in minutes
    pub token_rotation_interval_minutes: i64,
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        AuthConfig::default().into()
    }
}

impl From<AuthConfig> for TokenServiceConfig {
    fn from(config: AuthConfig) -> Self {
        Self {
            secret_key: config.secret_key,
            max_lifetime: config.login_max_lifetime,
            max_inactive_lifetime: config.login_max_inactive_lifetime,
            token_rotation_interval_minutes: config.token_rotation_interval_minutes,
        }
    }
}

impl TokenServiceConfig {
    /// Override the secret key.
    pub fn with_secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.secret_key = secret_key.into();
        self
    }

    /// Override the rotation cadence.
    pub fn with_rotation_interval_minutes(mut self, minutes: i64) -> Self {
        self.token_rotation_interval_minutes = minutes;
        self
    }
}
