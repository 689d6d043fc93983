//! Error types for session token management

mod types;

pub use types::{RefreshError, TokenError};
