//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `auth` - Session token lifetimes, rotation cadence and hash secret
//! - `cache` - Lookup cache sizing
//! - `database` - Database connection and pool configuration

pub mod auth;
pub mod cache;
pub mod database;

// Re-export commonly used types
pub use auth::AuthConfig;
pub use cache::LookupCacheConfig;
pub use database::DatabaseConfig;
