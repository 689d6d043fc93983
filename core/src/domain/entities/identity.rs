//! Authenticated identities as the session layer sees them.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::token::UserToken;

/// Namespace portion of an identity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityNamespace {
    User,
    ServiceAccount,
    Anonymous,
}

impl fmt::Display for IdentityNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityNamespace::User => write!(f, "user"),
            IdentityNamespace::ServiceAccount => write!(f, "service-account"),
            IdentityNamespace::Anonymous => write!(f, "anonymous"),
        }
    }
}

/// Namespaced identity id, rendered as `user:42`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityId {
    namespace: IdentityNamespace,
    id: String,
}

impl IdentityId {
    pub fn new(namespace: IdentityNamespace, id: impl Into<String>) -> Self {
        Self {
            namespace,
            id: id.into(),
        }
    }

    pub fn namespace(&self) -> IdentityNamespace {
        self.namespace
    }

    /// The namespace-local part of the id.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_user(&self) -> bool {
        self.namespace == IdentityNamespace::User
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.id)
    }
}

/// Authenticated identity flowing through the request hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: IdentityId,
    /// Session token the identity authenticated with, when session-based
    pub session_token: Option<UserToken>,
    /// Mechanism that authenticated the identity, e.g. `oauth_google`
    pub authenticated_by: String,
}

impl Identity {
    pub fn new(id: IdentityId, authenticated_by: impl Into<String>) -> Self {
        Self {
            id,
            session_token: None,
            authenticated_by: authenticated_by.into(),
        }
    }

    pub fn with_session_token(mut self, token: UserToken) -> Self {
        self.session_token = Some(token);
        self
    }
}
