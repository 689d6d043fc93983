//! # Infrastructure Layer
//!
//! Concrete implementations behind the `sessiond-core` interfaces:
//! - **Database**: MySQL token repository using SQLx, expressing every
//!   guarded mutation as a single conditional statement
//! - **Cache**: process-local TTL lookup cache backed by moka

pub mod cache;
pub mod database;

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}
