//! OAuth access-token refresh coordination for session-authenticated
//! users.
//!
//! Runs before the owning request sees the identity: when a user
//! authenticated through a session token backed by an upstream OAuth
//! provider, the upstream access token is refreshed first. Concurrent
//! requests for the same identity share one refresh. An unrecoverable
//! refresh failure hard-revokes the session token so the client has to
//! re-authenticate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::domain::entities::identity::Identity;
use crate::domain::entities::token::UserToken;
use crate::errors::{RefreshError, TokenError};

use super::singleflight::Group;

/// Hard ceiling on a single upstream refresh. The refresh runs on a
/// detached task, decoupled from the caller's cancellation; this timeout
/// is its only bound.
pub const REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

/// Upstream OAuth token refresher (external collaborator).
#[async_trait]
pub trait OAuthTokenRefresher: Send + Sync {
    /// Attempt to refresh the access token bound to `identity`.
    async fn try_token_refresh(&self, identity: &Identity) -> Result<(), RefreshError>;
}

/// Session token revocation as the coordinator needs it.
#[async_trait]
pub trait SessionRevoker: Send + Sync {
    async fn revoke_token(&self, token: &UserToken, soft: bool) -> Result<(), TokenError>;
}

/// Coordinates upstream OAuth refreshes for session-authenticated
/// identities, de-duplicating concurrent refreshes per identity.
pub struct OAuthTokenSync<U, S> {
    refresher: Arc<U>,
    sessions: Arc<S>,
    group: Group<Result<(), Arc<RefreshError>>>,
}

impl<U, S> OAuthTokenSync<U, S>
where
    U: OAuthTokenRefresher + 'static,
    S: SessionRevoker + 'static,
{
    pub fn new(refresher: Arc<U>, sessions: Arc<S>) -> Self {
        Self {
            refresher,
            sessions,
            group: Group::new(),
        }
    }

    /// Hook run before the owning request sees the identity.
    ///
    /// No-op unless the identity is a user carrying a session token whose
    /// `authenticated_by` tag begins with `oauth`. Otherwise coalesces
    /// concurrent invocations for the same identity id; only one refresh
    /// executes and every caller shares its outcome. On unrecoverable
    /// failure the session token is revoked (hard) exactly once and
    /// [`TokenError::ExpiredAccessToken`] is returned.
    pub async fn sync_oauth_token(&self, identity: &Identity) -> Result<(), TokenError> {
        if !identity.id.is_user() {
            return Ok(());
        }

        // Not authenticated through a session token, nothing to guard.
        let Some(session_token) = identity.session_token.clone() else {
            return Ok(());
        };

        if !identity.authenticated_by.starts_with("oauth") {
            return Ok(());
        }

        let refresher = Arc::clone(&self.refresher);
        let sessions = Arc::clone(&self.sessions);
        let identity = identity.clone();
        let flight_key = identity.id.to_string();

        let outcome = self
            .group
            .run(&flight_key, move || async move {
                debug!(identity = %identity.id, "singleflight request for oauth token sync");

                let refresh_err = match timeout(
                    REFRESH_TIMEOUT,
                    refresher.try_token_refresh(&identity),
                )
                .await
                {
                    Ok(Ok(())) => return Ok(()),
                    // The request already aborted for orthogonal reasons.
                    Ok(Err(RefreshError::Cancelled)) => return Ok(()),
                    Ok(Err(err)) => err,
                    Err(_) => RefreshError::TimedOut {
                        seconds: REFRESH_TIMEOUT.as_secs(),
                    },
                };

                error!(
                    identity = %identity.id,
                    error = %refresh_err,
                    "failed to refresh oauth access token"
                );

                if let Err(revoke_err) = sessions.revoke_token(&session_token, false).await {
                    warn!(
                        identity = %identity.id,
                        token_id = session_token.id,
                        error = %revoke_err,
                        "failed to revoke session token"
                    );
                }

                Err(Arc::new(refresh_err))
            })
            .await;

        match outcome {
            // An aborted flight is treated like a cancellation.
            Some(Ok(())) | None => Ok(()),
            Some(Err(err)) => Err(TokenError::ExpiredAccessToken(err)),
        }
    }
}
