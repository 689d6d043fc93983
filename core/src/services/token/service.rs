//! Session token service: issue, look up, rotate and revoke the tokens
//! that authenticate a user across successive requests.

use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::domain::entities::token::{SessionTokenRecord, UserToken};
use crate::domain::entities::user::User;
use crate::errors::TokenError;
use crate::repositories::{TokenRepository, TokenRotation};
use crate::services::oauth::SessionRevoker;

use super::cache::{cache_key, CachedToken, TokenLookupCache, CACHE_TTL};
use super::clock::Clock;
use super::config::TokenServiceConfig;
use super::rotation::{RotationPolicy, SELF_RACE_GUARD_SECS, URGENT_ROTATE_INTERVAL_SECS};

/// Service managing the lifecycle of user session tokens.
///
/// All mutations race-tolerantly go through conditional updates on the
/// repository; the service itself holds no locks. The cache bounds the
/// cost of the hot lookup path and may serve snapshots up to
/// [`CACHE_TTL`] stale.
pub struct TokenService<R, C, K> {
    repository: R,
    cache: C,
    clock: K,
    config: TokenServiceConfig,
    rotation: RotationPolicy,
}

impl<R, C, K> TokenService<R, C, K>
where
    R: TokenRepository,
    C: TokenLookupCache,
    K: Clock,
{
    pub fn new(repository: R, cache: C, clock: K, config: TokenServiceConfig) -> Self {
        let rotation = RotationPolicy::new(config.token_rotation_interval_minutes);
        Self {
            repository,
            cache,
            clock,
            config,
            rotation,
        }
    }

    /// Issue a new session token for `user`.
    ///
    /// Mints 16 cryptographically random bytes rendered as 32 lowercase
    /// hex chars, stores only the hash, and returns the projection with
    /// the raw material attached.
    pub async fn create_token(
        &self,
        user: &User,
        client_ip: &str,
        user_agent: &str,
    ) -> Result<UserToken, TokenError> {
        let raw_token = generate_raw_token()?;
        let hashed_token = self.hash(&raw_token);

        let now = self.clock.unix_now();
        let record = SessionTokenRecord {
            id: 0,
            user_id: user.id,
            auth_token: hashed_token.clone(),
            prev_auth_token: hashed_token,
            client_ip: client_ip.to_string(),
            user_agent: user_agent.to_string(),
            auth_token_seen: false,
            seen_at: 0,
            created_at: now,
            rotated_at: now,
            updated_at: now,
            revoked_at: 0,
        };

        let record = self.repository.insert_token(record).await?;

        debug!(
            token_id = record.id,
            user_id = record.user_id,
            client_ip = %record.client_ip,
            user_agent = %record.user_agent,
            "user session token created"
        );

        Ok(record.into_user_token(raw_token))
    }

    /// Resolve a raw token to the user token it authenticates.
    ///
    /// The central read path: cache probe (hash + store query on miss),
    /// revocation and expiry checks, then the observation state
    /// transitions. A caller presenting the previous hash slot after a
    /// rotation re-opens the observation window once the urgent-rotate
    /// grace has passed; a caller presenting an unobserved current slot
    /// marks it seen. Both transitions are conditional updates whose
    /// zero-rows outcome is benign.
    pub async fn lookup_token(&self, raw_token: &str) -> Result<UserToken, TokenError> {
        let (mut record, hashed_token) = self.lookup_cached(raw_token).await?;
        let now = self.clock.unix_now();

        if record.is_revoked() {
            debug!(
                user_id = record.user_id,
                token_id = record.id,
                "user session token has been revoked"
            );
            return Err(TokenError::Revoked {
                user_id: record.user_id,
                token_id: record.id,
            });
        }

        if record.created_at <= self.created_after(now) || record.rotated_at <= self.rotated_after(now) {
            debug!(
                user_id = record.user_id,
                token_id = record.id,
                "user session token has expired"
            );
            return Err(TokenError::Expired {
                user_id: record.user_id,
                token_id: record.id,
            });
        }

        if record.auth_token != hashed_token
            && record.prev_auth_token == hashed_token
            && record.auth_token_seen
        {
            let rotated_before = now - URGENT_ROTATE_INTERVAL_SECS;
            let affected = self
                .repository
                .reset_previous_seen(record.id, &record.prev_auth_token, rotated_before)
                .await?;

            if affected == 0 {
                debug!(
                    token_id = record.id,
                    user_id = record.user_id,
                    "previous token observation unchanged"
                );
            } else {
                debug!(
                    token_id = record.id,
                    user_id = record.user_id,
                    "previous token observed, rotation window re-opened"
                );
            }
        }

        if !record.auth_token_seen && record.auth_token == hashed_token {
            let affected = self
                .repository
                .mark_current_seen(record.id, &record.auth_token, now)
                .await?;

            if affected == 1 {
                record.auth_token_seen = true;
                record.seen_at = now;
                debug!(
                    token_id = record.id,
                    user_id = record.user_id,
                    "token observed"
                );
            } else {
                // A concurrent rotation replaced the slot under us.
                debug!(
                    token_id = record.id,
                    user_id = record.user_id,
                    "token observation lost to concurrent rotation"
                );
            }
        }

        Ok(record.into_user_token(raw_token.to_string()))
    }

    /// Rotate the token if it is due, minting fresh material.
    ///
    /// Seen tokens rotate on the configured cadence; unseen tokens rotate
    /// urgently after 60 seconds. The rotation itself is a single
    /// conditional statement; when a concurrent racer wins, this returns
    /// `Ok(false)` without error. On success the caller's projection has
    /// its raw material replaced; the persisted row is authoritative for
    /// everything else.
    pub async fn try_rotate_token(
        &self,
        token: &mut UserToken,
        client_ip: &str,
        user_agent: &str,
    ) -> Result<bool, TokenError> {
        let record = token.to_record();
        let now = self.clock.now();

        if !self.rotation.needs_rotation(&record, now) {
            return Ok(false);
        }

        debug!(
            token_id = record.id,
            auth_token_seen = record.auth_token_seen,
            rotated_at = record.rotated_at,
            "token needs rotation"
        );

        let raw_token = generate_raw_token()?;
        let hashed_token = self.hash(&raw_token);

        let affected = self
            .repository
            .rotate(TokenRotation {
                token_id: record.id,
                new_hashed_token: hashed_token,
                client_ip: client_ip.to_string(),
                user_agent: user_agent.to_string(),
                rotated_at: now.timestamp(),
                race_guard_before: now.timestamp() - SELF_RACE_GUARD_SECS,
            })
            .await?;

        debug!(
            affected,
            token_id = record.id,
            user_id = record.user_id,
            "session token rotated"
        );

        if affected > 0 {
            token.unhashed_token = raw_token;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Revoke a token: soft sets `revoked_at`, hard deletes the row.
    pub async fn revoke_token(&self, token: &UserToken, soft: bool) -> Result<(), TokenError> {
        let affected = if soft {
            self.repository
                .soft_revoke(token.id, self.clock.unix_now())
                .await?
        } else {
            self.repository.delete_token(token.id).await?
        };

        if affected == 0 {
            debug!(
                token_id = token.id,
                user_id = token.user_id,
                "user session token not found for revoke"
            );
            return Err(TokenError::NotFound);
        }

        debug!(
            token_id = token.id,
            user_id = token.user_id,
            soft,
            "user session token revoked"
        );

        Ok(())
    }

    /// Hard-delete every token of `user_id`.
    pub async fn revoke_all_user_tokens(&self, user_id: i64) -> Result<(), TokenError> {
        let affected = self.repository.delete_user_tokens(user_id).await?;
        debug!(user_id, count = affected, "all user session tokens revoked");
        Ok(())
    }

    /// Hard-delete every token of each listed user. Empty input is a
    /// no-op.
    pub async fn batch_revoke_all_user_tokens(&self, user_ids: &[i64]) -> Result<(), TokenError> {
        if user_ids.is_empty() {
            return Ok(());
        }

        let affected = self.repository.delete_tokens_for_users(user_ids).await?;
        debug!(
            users = user_ids.len(),
            count = affected,
            "all session tokens for given users revoked"
        );
        Ok(())
    }

    /// Fetch one token by id, scoped to its owning user.
    pub async fn get_user_token(
        &self,
        user_id: i64,
        token_id: i64,
    ) -> Result<UserToken, TokenError> {
        self.repository
            .find_by_id(user_id, token_id)
            .await?
            .map(|record| record.into_user_token(String::new()))
            .ok_or(TokenError::NotFound)
    }

    /// All active (not expired, not revoked) tokens of `user_id`.
    pub async fn get_user_tokens(&self, user_id: i64) -> Result<Vec<UserToken>, TokenError> {
        let now = self.clock.unix_now();
        let records = self
            .repository
            .find_active_by_user(user_id, self.created_after(now), self.rotated_after(now))
            .await?;

        Ok(records
            .into_iter()
            .map(|record| record.into_user_token(String::new()))
            .collect())
    }

    /// All soft-revoked tokens of `user_id`.
    pub async fn get_user_revoked_tokens(
        &self,
        user_id: i64,
    ) -> Result<Vec<UserToken>, TokenError> {
        let records = self.repository.find_revoked_by_user(user_id).await?;

        Ok(records
            .into_iter()
            .map(|record| record.into_user_token(String::new()))
            .collect())
    }

    async fn lookup_cached(
        &self,
        raw_token: &str,
    ) -> Result<(SessionTokenRecord, String), TokenError> {
        let key = cache_key(raw_token);

        if let Some(cached) = self.cache.get(&key).await {
            debug!("session token found in cache");
            return Ok((cached.record, cached.hashed_token));
        }

        debug!("no session token found in cache");
        let hashed_token = self.hash(raw_token);
        let record = self
            .repository
            .find_by_hash(&hashed_token)
            .await?
            .ok_or(TokenError::NotFound)?;

        debug!(
            token_id = record.id,
            user_id = record.user_id,
            "caching session token"
        );
        self.cache
            .set(
                &key,
                CachedToken {
                    hashed_token: hashed_token.clone(),
                    record: record.clone(),
                },
                CACHE_TTL,
            )
            .await;

        Ok((record, hashed_token))
    }

    fn created_after(&self, now: i64) -> i64 {
        now - self.config.max_lifetime
    }

    fn rotated_after(&self, now: i64) -> i64 {
        now - self.config.max_inactive_lifetime
    }

    fn hash(&self, raw_token: &str) -> String {
        hash_token(raw_token, &self.config.secret_key)
    }
}

#[async_trait]
impl<R, C, K> SessionRevoker for TokenService<R, C, K>
where
    R: TokenRepository,
    C: TokenLookupCache,
    K: Clock,
{
    async fn revoke_token(&self, token: &UserToken, soft: bool) -> Result<(), TokenError> {
        TokenService::revoke_token(self, token, soft).await
    }
}

/// Read-side counter over the active token rows, kept separate from the
/// mutating service surface.
pub struct ActiveTokenService<R, K> {
    repository: R,
    clock: K,
    config: TokenServiceConfig,
}

impl<R, K> ActiveTokenService<R, K>
where
    R: TokenRepository,
    K: Clock,
{
    pub fn new(repository: R, clock: K, config: TokenServiceConfig) -> Self {
        Self {
            repository,
            clock,
            config,
        }
    }

    /// Count tokens inside both lifetime windows and not revoked.
    pub async fn active_token_count(&self) -> Result<i64, TokenError> {
        let now = self.clock.unix_now();
        self.repository
            .count_active(now - self.config.max_lifetime, now - self.config.max_inactive_lifetime)
            .await
    }
}

/// `SHA-256(raw_token + secret)` rendered as lowercase hex, the durable
/// token identifier. Deterministic across processes sharing the secret.
pub fn hash_token(raw_token: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// 16 cryptographically random bytes as 32 lowercase hex chars.
fn generate_raw_token() -> Result<String, TokenError> {
    let mut buf = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| TokenError::RandomSource {
            reason: e.to_string(),
        })?;
    Ok(hex::encode(buf))
}
