//! # Sessiond Core
//!
//! Core business logic and domain layer for the sessiond user session
//! token service. This crate contains the domain entities, the token and
//! OAuth-refresh services, repository and cache interfaces, and error
//! types. Persistence and cache implementations live in `sessiond-infra`.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
