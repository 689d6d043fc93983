//! Database module - MySQL implementations using SQLx
//!
//! Provides connection pool management and the MySQL token repository.

pub mod connection;
pub mod mysql;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use connection::DatabasePool;
pub use mysql::MySqlTokenRepository;
