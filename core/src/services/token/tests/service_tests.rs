//! Unit tests for the token service covering the lookup state machine,
//! rotation races and revocation.

use chrono::{DateTime, Utc};

use crate::domain::entities::token::UserToken;
use crate::domain::entities::user::User;
use crate::errors::TokenError;
use crate::services::token::{
    hash_token, ActiveTokenService, ManualClock, TokenService, TokenServiceConfig,
};

use super::mocks::{MemoryLookupCache, MockTokenRepository, NoopLookupCache};

const T0: i64 = 1_700_000_000;
const SECRET: &str = "test-secret";

fn at(unix: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(unix, 0).unwrap()
}

fn test_config() -> TokenServiceConfig {
    TokenServiceConfig {
        secret_key: SECRET.to_string(),
        max_lifetime: 30 * 86400,
        max_inactive_lifetime: 7 * 86400,
        token_rotation_interval_minutes: 10,
    }
}

fn test_service(
    repo: MockTokenRepository,
    clock: ManualClock,
) -> TokenService<MockTokenRepository, NoopLookupCache, ManualClock> {
    TokenService::new(repo, NoopLookupCache, clock, test_config())
}

fn test_user() -> User {
    User::new(42, "alice")
}

#[tokio::test]
async fn create_then_lookup_marks_seen() {
    let repo = MockTokenRepository::new();
    let clock = ManualClock::new(at(T0));
    let service = test_service(repo.clone(), clock.clone());

    let token = service
        .create_token(&test_user(), "10.0.0.1", "ua-a")
        .await
        .unwrap();

    // 32 lowercase hex chars of raw material
    assert_eq!(token.unhashed_token.len(), 32);
    assert!(token
        .unhashed_token
        .chars()
        .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

    let record = repo.get(token.id).unwrap();
    let hashed = hash_token(&token.unhashed_token, SECRET);
    assert_eq!(record.auth_token, hashed);
    assert_eq!(record.prev_auth_token, hashed);
    assert!(!record.auth_token_seen);
    assert_eq!(record.seen_at, 0);
    assert_eq!(record.created_at, T0);
    assert_eq!(record.rotated_at, T0);
    assert_eq!(record.client_ip, "10.0.0.1");
    assert_eq!(record.user_agent, "ua-a");

    clock.advance_secs(10);
    let looked_up = service.lookup_token(&token.unhashed_token).await.unwrap();
    assert_eq!(looked_up.user_id, 42);
    assert!(looked_up.auth_token_seen);
    assert_eq!(looked_up.seen_at, T0 + 10);

    let record = repo.get(token.id).unwrap();
    assert!(record.auth_token_seen);
    assert_eq!(record.seen_at, T0 + 10);
}

#[tokio::test]
async fn repeated_lookup_does_not_touch_seen_at() {
    let repo = MockTokenRepository::new();
    let clock = ManualClock::new(at(T0));
    let service = test_service(repo.clone(), clock.clone());

    let token = service.create_token(&test_user(), "", "ua").await.unwrap();

    service.lookup_token(&token.unhashed_token).await.unwrap();
    clock.advance_secs(20);
    service.lookup_token(&token.unhashed_token).await.unwrap();

    // Observed exactly once; the second lookup skips the seen update.
    assert_eq!(repo.get(token.id).unwrap().seen_at, T0);
}

#[tokio::test]
async fn lookup_unknown_token_is_not_found() {
    let service = test_service(MockTokenRepository::new(), ManualClock::new(at(T0)));

    let err = service.lookup_token("0123456789abcdef0123456789abcdef").await;
    assert!(matches!(err, Err(TokenError::NotFound)));
}

#[tokio::test]
async fn lookup_revoked_token_with_cold_cache() {
    let repo = MockTokenRepository::new();
    let clock = ManualClock::new(at(T0));
    let service = test_service(repo.clone(), clock.clone());

    let token = service.create_token(&test_user(), "", "ua").await.unwrap();
    service.revoke_token(&token, true).await.unwrap();

    match service.lookup_token(&token.unhashed_token).await {
        Err(TokenError::Revoked { user_id, token_id }) => {
            assert_eq!(user_id, 42);
            assert_eq!(token_id, token.id);
        }
        other => panic!("expected revoked error, got {other:?}"),
    }
}

#[tokio::test]
async fn cached_lookup_serves_stale_snapshot_until_expiry() {
    let repo = MockTokenRepository::new();
    let clock = ManualClock::new(at(T0));
    let cache = MemoryLookupCache::new();
    let service = TokenService::new(repo.clone(), cache.clone(), clock.clone(), test_config());

    let token = service.create_token(&test_user(), "", "ua").await.unwrap();
    service.lookup_token(&token.unhashed_token).await.unwrap();

    service.revoke_token(&token, true).await.unwrap();

    // The pre-revoke snapshot is still cached: the revocation goes
    // unnoticed for at most one TTL window.
    assert!(service.lookup_token(&token.unhashed_token).await.is_ok());

    // Once the entry expires the store is consulted again.
    cache.clear();
    assert!(matches!(
        service.lookup_token(&token.unhashed_token).await,
        Err(TokenError::Revoked { .. })
    ));
}

#[tokio::test]
async fn lookup_rejects_token_past_absolute_lifetime() {
    let repo = MockTokenRepository::new();
    let clock = ManualClock::new(at(T0));
    let config = TokenServiceConfig {
        max_lifetime: 100,
        max_inactive_lifetime: 10_000,
        ..test_config()
    };
    let service = TokenService::new(repo.clone(), NoopLookupCache, clock.clone(), config);

    let token = service.create_token(&test_user(), "", "ua").await.unwrap();

    clock.advance_secs(99);
    assert!(service.lookup_token(&token.unhashed_token).await.is_ok());

    clock.advance_secs(2);
    match service.lookup_token(&token.unhashed_token).await {
        Err(TokenError::Expired { user_id, token_id }) => {
            assert_eq!(user_id, 42);
            assert_eq!(token_id, token.id);
        }
        other => panic!("expected expired error, got {other:?}"),
    }
}

#[tokio::test]
async fn lookup_rejects_inactive_token() {
    let repo = MockTokenRepository::new();
    let clock = ManualClock::new(at(T0));
    let config = TokenServiceConfig {
        max_lifetime: 10_000,
        max_inactive_lifetime: 50,
        ..test_config()
    };
    let service = TokenService::new(repo.clone(), NoopLookupCache, clock.clone(), config);

    let token = service.create_token(&test_user(), "", "ua").await.unwrap();

    clock.advance_secs(51);
    assert!(matches!(
        service.lookup_token(&token.unhashed_token).await,
        Err(TokenError::Expired { .. })
    ));
}

#[tokio::test]
async fn normal_rotation_keeps_one_grace_slot() {
    let repo = MockTokenRepository::new();
    let clock = ManualClock::new(at(T0));
    let service = test_service(repo.clone(), clock.clone());

    let token = service
        .create_token(&test_user(), "10.0.0.1", "ua-a")
        .await
        .unwrap();
    let old_raw = token.unhashed_token.clone();
    let old_hash = hash_token(&old_raw, SECRET);

    let mut token_seen = service.lookup_token(&old_raw).await.unwrap();
    assert!(token_seen.auth_token_seen);

    clock.advance_secs(11 * 60);
    let rotated = service
        .try_rotate_token(&mut token_seen, "10.0.0.2", "ua-b")
        .await
        .unwrap();
    assert!(rotated);
    let new_raw = token_seen.unhashed_token.clone();
    assert_ne!(new_raw, old_raw);

    let record = repo.get(token.id).unwrap();
    assert_eq!(record.auth_token, hash_token(&new_raw, SECRET));
    assert_eq!(record.prev_auth_token, old_hash);
    assert!(!record.auth_token_seen);
    assert_eq!(record.seen_at, 0);
    assert_eq!(record.rotated_at, T0 + 11 * 60);
    assert_eq!(record.client_ip, "10.0.0.2");
    assert_eq!(record.user_agent, "ua-b");

    // An in-flight client holding the superseded value still resolves.
    let via_prev = service.lookup_token(&old_raw).await.unwrap();
    assert_eq!(via_prev.user_id, 42);
    assert_eq!(via_prev.id, token.id);

    // The new value resolves the same row and flips seen.
    let via_new = service.lookup_token(&new_raw).await.unwrap();
    assert_eq!(via_new.id, token.id);
    assert!(repo.get(token.id).unwrap().auth_token_seen);
}

#[tokio::test]
async fn urgent_rotation_does_not_advance_grace_slot() {
    let repo = MockTokenRepository::new();
    let clock = ManualClock::new(at(T0));
    let service = test_service(repo.clone(), clock.clone());

    let mut token = service.create_token(&test_user(), "", "ua").await.unwrap();
    let original_hash = hash_token(&token.unhashed_token, SECRET);

    // Minted 70 seconds ago, never observed.
    clock.advance_secs(70);
    let rotated = service.try_rotate_token(&mut token, "", "ua").await.unwrap();
    assert!(rotated);

    let record = repo.get(token.id).unwrap();
    assert_ne!(record.auth_token, original_hash);
    // The outgoing slot was never observed, so it is not worth a grace
    // window.
    assert_eq!(record.prev_auth_token, original_hash);
    assert!(!record.auth_token_seen);
}

#[tokio::test]
async fn rotation_is_skipped_when_not_due() {
    let repo = MockTokenRepository::new();
    let clock = ManualClock::new(at(T0));
    let service = test_service(repo.clone(), clock.clone());

    let mut unseen = service.create_token(&test_user(), "", "ua").await.unwrap();
    clock.advance_secs(30);
    assert!(!service.try_rotate_token(&mut unseen, "", "ua").await.unwrap());

    let mut seen = service.lookup_token(&unseen.unhashed_token).await.unwrap();
    clock.advance_secs(5 * 60);
    assert!(!service.try_rotate_token(&mut seen, "", "ua").await.unwrap());
}

#[tokio::test]
async fn concurrent_rotation_has_exactly_one_winner() {
    let repo = MockTokenRepository::new();
    let clock = ManualClock::new(at(T0));
    let service = test_service(repo.clone(), clock.clone());

    let token = service.create_token(&test_user(), "", "ua").await.unwrap();
    let seen = service.lookup_token(&token.unhashed_token).await.unwrap();
    clock.advance_secs(11 * 60);

    let mut first: UserToken = seen.clone();
    let mut second: UserToken = seen.clone();

    let (a, b) = tokio::join!(
        service.try_rotate_token(&mut first, "", "ua"),
        service.try_rotate_token(&mut second, "", "ua"),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert!(a ^ b, "exactly one rotation must win (a={a}, b={b})");

    // One rotation persisted: the winner's material matches the row.
    let record = repo.get(token.id).unwrap();
    let winner = if a { &first } else { &second };
    assert_eq!(record.auth_token, hash_token(&winner.unhashed_token, SECRET));
    assert_eq!(record.rotated_at, T0 + 11 * 60);
}

#[tokio::test]
async fn previous_slot_lookup_reopens_window_after_grace() {
    let repo = MockTokenRepository::new();
    let clock = ManualClock::new(at(T0));
    let service = test_service(repo.clone(), clock.clone());

    let token = service.create_token(&test_user(), "", "ua").await.unwrap();
    let old_raw = token.unhashed_token.clone();

    let mut seen = service.lookup_token(&old_raw).await.unwrap();
    clock.advance_secs(11 * 60);
    assert!(service.try_rotate_token(&mut seen, "", "ua").await.unwrap());
    let new_raw = seen.unhashed_token.clone();

    // The new slot gets observed; the row is fully rotated and seen.
    service.lookup_token(&new_raw).await.unwrap();
    assert!(repo.get(token.id).unwrap().auth_token_seen);

    // Within the grace interval a previous-slot sighting changes nothing.
    clock.advance_secs(30);
    service.lookup_token(&old_raw).await.unwrap();
    assert!(repo.get(token.id).unwrap().auth_token_seen);

    // Past the grace interval it re-opens the observation window.
    clock.advance_secs(31);
    let projection = service.lookup_token(&old_raw).await.unwrap();
    assert!(!repo.get(token.id).unwrap().auth_token_seen);
    // The returned snapshot is the pre-update one.
    assert!(projection.auth_token_seen);
}

#[tokio::test]
async fn soft_revoke_keeps_row_hard_revoke_deletes_it() {
    let repo = MockTokenRepository::new();
    let clock = ManualClock::new(at(T0));
    let service = test_service(repo.clone(), clock.clone());

    let soft = service.create_token(&test_user(), "", "ua").await.unwrap();
    let hard = service.create_token(&test_user(), "", "ua").await.unwrap();

    service.revoke_token(&soft, true).await.unwrap();
    let record = repo.get(soft.id).unwrap();
    assert_eq!(record.revoked_at, T0);

    service.revoke_token(&hard, false).await.unwrap();
    assert!(repo.get(hard.id).is_none());
}

#[tokio::test]
async fn revoking_missing_token_is_not_found() {
    let service = test_service(MockTokenRepository::new(), ManualClock::new(at(T0)));

    let mut ghost = UserToken {
        id: 999,
        user_id: 42,
        auth_token: String::new(),
        prev_auth_token: String::new(),
        client_ip: String::new(),
        user_agent: String::new(),
        auth_token_seen: false,
        seen_at: 0,
        created_at: T0,
        rotated_at: T0,
        updated_at: T0,
        revoked_at: 0,
        unhashed_token: String::new(),
    };

    assert!(matches!(
        service.revoke_token(&ghost, true).await,
        Err(TokenError::NotFound)
    ));
    ghost.id = 998;
    assert!(matches!(
        service.revoke_token(&ghost, false).await,
        Err(TokenError::NotFound)
    ));
}

#[tokio::test]
async fn revoke_all_and_batch_revoke_delete_rows() {
    let repo = MockTokenRepository::new();
    let clock = ManualClock::new(at(T0));
    let service = test_service(repo.clone(), clock.clone());

    let alice = User::new(1, "alice");
    let bob = User::new(2, "bob");
    let carol = User::new(3, "carol");
    for user in [&alice, &alice, &bob, &carol] {
        service.create_token(user, "", "ua").await.unwrap();
    }

    service.revoke_all_user_tokens(1).await.unwrap();
    assert_eq!(repo.len(), 2);

    // Empty input is a no-op.
    service.batch_revoke_all_user_tokens(&[]).await.unwrap();
    assert_eq!(repo.len(), 2);

    service.batch_revoke_all_user_tokens(&[2, 3]).await.unwrap();
    assert_eq!(repo.len(), 0);
}

#[tokio::test]
async fn get_user_token_is_scoped_to_owner() {
    let repo = MockTokenRepository::new();
    let clock = ManualClock::new(at(T0));
    let service = test_service(repo.clone(), clock.clone());

    let token = service.create_token(&test_user(), "", "ua").await.unwrap();

    let found = service.get_user_token(42, token.id).await.unwrap();
    assert_eq!(found.id, token.id);
    assert!(found.unhashed_token.is_empty());

    assert!(matches!(
        service.get_user_token(43, token.id).await,
        Err(TokenError::NotFound)
    ));
}

#[tokio::test]
async fn listing_separates_active_and_revoked_tokens() {
    let repo = MockTokenRepository::new();
    let clock = ManualClock::new(at(T0));
    let service = test_service(repo.clone(), clock.clone());

    let active = service.create_token(&test_user(), "", "ua").await.unwrap();
    let revoked = service.create_token(&test_user(), "", "ua").await.unwrap();
    service.create_token(&User::new(7, "other"), "", "ua").await.unwrap();

    service.revoke_token(&revoked, true).await.unwrap();

    let active_tokens = service.get_user_tokens(42).await.unwrap();
    assert_eq!(active_tokens.len(), 1);
    assert_eq!(active_tokens[0].id, active.id);

    let revoked_tokens = service.get_user_revoked_tokens(42).await.unwrap();
    assert_eq!(revoked_tokens.len(), 1);
    assert_eq!(revoked_tokens[0].id, revoked.id);
}

#[tokio::test]
async fn active_token_count_skips_revoked_and_stale() {
    let repo = MockTokenRepository::new();
    let clock = ManualClock::new(at(T0));
    let config = TokenServiceConfig {
        max_lifetime: 10_000,
        max_inactive_lifetime: 100,
        ..test_config()
    };
    let service = TokenService::new(repo.clone(), NoopLookupCache, clock.clone(), config.clone());
    let counter = ActiveTokenService::new(repo.clone(), clock.clone(), config);

    let _stale = service.create_token(&test_user(), "", "ua").await.unwrap();
    clock.advance_secs(200);

    let _live = service.create_token(&test_user(), "", "ua").await.unwrap();
    let revoked = service.create_token(&test_user(), "", "ua").await.unwrap();
    service.revoke_token(&revoked, true).await.unwrap();

    assert_eq!(counter.active_token_count().await.unwrap(), 1);
}

#[tokio::test]
async fn hash_is_deterministic_and_secret_bound() {
    let raw = "0123456789abcdef0123456789abcdef";

    let a = hash_token(raw, SECRET);
    let b = hash_token(raw, SECRET);
    assert_eq!(a, b);
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

    assert_ne!(a, hash_token(raw, "other-secret"));
}
