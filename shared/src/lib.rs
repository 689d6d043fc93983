//! Shared configuration types for the sessiond server
//!
//! This crate provides the configuration surface used across the server
//! crates:
//! - Session token lifetimes and rotation cadence
//! - Database connection and pool settings
//! - Lookup cache sizing

pub mod config;

// Re-export commonly used items at crate root
pub use config::{AuthConfig, DatabaseConfig, LookupCacheConfig};
