//! User entity as the token service sees it.

use serde::{Deserialize, Serialize};

/// The user a session token is issued for. The token service only needs
/// the identity; profile data lives elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub login: String,
}

impl User {
    pub fn new(id: i64, login: impl Into<String>) -> Self {
        Self {
            id,
            login: login.into(),
        }
    }
}
