//! 认证流程测试（进程内存储）

use std::sync::{Arc, Mutex};

use agora_auth_core::{Argon2PasswordHasher, TokenService};
use agora_errors::{AppError, AppResult};
use agora_identity::application::{AuthDependencies, AuthService};
use agora_identity::domain::notification::{Notifier, VerificationNotice};
use agora_identity::domain::value_objects::{Email, Username};
use agora_identity::infrastructure::persistence::memory::MemoryStore;
use chrono::Duration;

const PASSWORD: &str = "correct horse battery";

// Mocks
#[derive(Default)]
struct MockNotifier {
    notices: Mutex<Vec<VerificationNotice>>,
    reject: bool,
}

impl MockNotifier {
    fn rejecting() -> Self {
        Self {
            reject: true,
            ..Default::default()
        }
    }

    fn last_token(&self) -> String {
        self.notices.lock().unwrap().last().unwrap().token.clone()
    }

    fn count(&self) -> usize {
        self.notices.lock().unwrap().len()
    }
}

impl Notifier for MockNotifier {
    fn notify(&self, notice: VerificationNotice) -> AppResult<()> {
        if self.reject {
            return Err(AppError::delivery("Notification queue is full"));
        }
        self.notices.lock().unwrap().push(notice);
        Ok(())
    }
}

struct Harness {
    service: Arc<AuthService>,
    store: MemoryStore,
    notifier: Arc<MockNotifier>,
}

fn harness_with(notifier: MockNotifier, verification_ttl: Duration) -> Harness {
    let store = MemoryStore::new();
    let notifier = Arc::new(notifier);

    let service = AuthService::new(
        AuthDependencies {
            users: store.users(),
            uow_factory: Arc::new(store.clone()),
            hasher: Arc::new(Argon2PasswordHasher::with_params(1024, 1, 1).unwrap()),
            token_service: TokenService::new(
                "test-signing-secret-of-sufficient-length",
                Duration::minutes(15),
                "agora",
            ),
            notifier: notifier.clone(),
        },
        verification_ttl,
    )
    .unwrap();

    Harness {
        service: Arc::new(service),
        store,
        notifier,
    }
}

fn harness() -> Harness {
    harness_with(MockNotifier::default(), Duration::hours(24))
}

impl Harness {
    async fn user_id(&self, username: &str) -> agora_common::UserId {
        self.store
            .users()
            .find_by_username(&Username::new(username).unwrap())
            .await
            .unwrap()
            .unwrap()
            .id
    }

    async fn is_enabled(&self, username: &str) -> bool {
        self.store
            .users()
            .find_by_username(&Username::new(username).unwrap())
            .await
            .unwrap()
            .map(|u| u.is_enabled())
            .unwrap_or(false)
    }

    async fn register_and_verify(&self, username: &str, email: &str) {
        self.service.signup(username, email, PASSWORD).await.unwrap();
        self.service
            .verify_account(&self.notifier.last_token())
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_signup_creates_disabled_user_with_one_token() {
    let h = harness();

    h.service
        .signup("alice", "alice@example.com", PASSWORD)
        .await
        .unwrap();

    assert_eq!(h.store.user_count().await, 1);
    assert!(!h.is_enabled("alice").await);

    let user_id = h.user_id("alice").await;
    let tokens = h.store.tokens_for_user(&user_id).await;
    assert_eq!(tokens.len(), 1);
    assert!(!tokens[0].is_consumed());

    assert_eq!(h.notifier.count(), 1);
    let notices = h.notifier.notices.lock().unwrap();
    assert_eq!(notices[0].email, "alice@example.com");
    assert_eq!(notices[0].token, tokens[0].token);
}

#[tokio::test]
async fn test_signup_normalizes_email() {
    let h = harness();

    h.service
        .signup("alice", "  Alice@Example.COM ", PASSWORD)
        .await
        .unwrap();

    let found = h
        .store
        .users()
        .find_by_email(&Email::new("alice@example.com").unwrap())
        .await
        .unwrap();
    assert!(found.is_some());
}

#[tokio::test]
async fn test_signup_rejects_invalid_input() {
    let h = harness();

    for (username, email, password) in [
        ("", "alice@example.com", PASSWORD),
        ("al", "alice@example.com", PASSWORD),
        ("alice", "not-an-email", PASSWORD),
        ("alice", "alice@example.com", "short"),
    ] {
        let err = h.service.signup(username, email, password).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "{:?}", err);
    }

    assert_eq!(h.store.user_count().await, 0);
    assert_eq!(h.notifier.count(), 0);
}

#[tokio::test]
async fn test_duplicate_signup_conflicts_without_orphan_token() {
    let h = harness();
    h.service
        .signup("alice", "alice@example.com", PASSWORD)
        .await
        .unwrap();

    let err = h
        .service
        .signup("alice", "other@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = h
        .service
        .signup("bob", "alice@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    assert_eq!(h.store.user_count().await, 1);
    let user_id = h.user_id("alice").await;
    assert_eq!(h.store.tokens_for_user(&user_id).await.len(), 1);
    assert_eq!(h.notifier.count(), 1);
}

#[tokio::test]
async fn test_unknown_token_is_not_found() {
    let h = harness();
    h.service
        .signup("alice", "alice@example.com", PASSWORD)
        .await
        .unwrap();

    let err = h.service.verify_account("no-such-token").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(!h.is_enabled("alice").await);

    let user_id = h.user_id("alice").await;
    assert!(!h.store.tokens_for_user(&user_id).await[0].is_consumed());
}

#[tokio::test]
async fn test_verify_enables_account_once() {
    let h = harness();
    h.service
        .signup("alice", "alice@example.com", PASSWORD)
        .await
        .unwrap();
    let token = h.notifier.last_token();

    h.service.verify_account(&token).await.unwrap();
    assert!(h.is_enabled("alice").await);

    let err = h.service.verify_account(&token).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(h.is_enabled("alice").await);
}

#[tokio::test]
async fn test_concurrent_verification_succeeds_once() {
    let h = harness();
    h.service
        .signup("alice", "alice@example.com", PASSWORD)
        .await
        .unwrap();
    let token = h.notifier.last_token();

    let first = {
        let service = h.service.clone();
        let token = token.clone();
        tokio::spawn(async move { service.verify_account(&token).await })
    };
    let second = {
        let service = h.service.clone();
        let token = token.clone();
        tokio::spawn(async move { service.verify_account(&token).await })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::Conflict(_))))
        .count();

    assert_eq!(ok, 1);
    assert_eq!(conflicts, 1);
    assert!(h.is_enabled("alice").await);
}

#[tokio::test]
async fn test_expired_token_is_not_found() {
    let h = harness_with(MockNotifier::default(), Duration::seconds(-1));
    h.service
        .signup("alice", "alice@example.com", PASSWORD)
        .await
        .unwrap();

    let err = h
        .service
        .verify_account(&h.notifier.last_token())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(!h.is_enabled("alice").await);
}

#[tokio::test]
async fn test_login_after_verification() {
    let h = harness();
    h.register_and_verify("alice", "alice@example.com").await;

    let result = h.service.login("alice", PASSWORD).await.unwrap();
    assert_eq!(result.username, "alice");
    assert!(!result.authentication_token.is_empty());

    let caller = h
        .service
        .authenticate(&result.authentication_token)
        .unwrap();
    assert_eq!(caller.username, "alice");
    assert_eq!(caller.session_expires_at, result.expires_at);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let h = harness();
    h.register_and_verify("alice", "alice@example.com").await;
    h.service
        .signup("bob", "bob@example.com", PASSWORD)
        .await
        .unwrap();

    let too_long = "x".repeat(129);
    let attempts = [
        ("bob", PASSWORD),
        ("alice", "wrong password"),
        ("mallory", PASSWORD),
        ("!!", PASSWORD),
        ("alice", too_long.as_str()),
    ];

    let messages: Vec<String> = {
        let mut messages = Vec::new();
        for (username, password) in attempts {
            let err = h.service.login(username, password).await.unwrap_err();
            assert!(matches!(err, AppError::Unauthenticated(_)), "{:?}", err);
            messages.push(err.to_string());
        }
        messages
    };

    assert!(messages.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn test_tampered_session_token_rejected() {
    let h = harness();
    h.register_and_verify("alice", "alice@example.com").await;
    let token = h.service.login("alice", PASSWORD).await.unwrap().authentication_token;

    let mut tampered = token.into_bytes();
    let last = tampered.len() - 1;
    tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    let err = h.service.authenticate(&tampered).unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(_)));
}

#[tokio::test]
async fn test_rejected_notice_keeps_account() {
    let h = harness_with(MockNotifier::rejecting(), Duration::hours(24));

    let err = h
        .service
        .signup("alice", "alice@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Delivery(_)));

    assert_eq!(h.store.user_count().await, 1);
    let user_id = h.user_id("alice").await;
    assert_eq!(h.store.tokens_for_user(&user_id).await.len(), 1);
}

#[tokio::test]
async fn test_resend_replaces_unconsumed_token() {
    let h = harness();
    h.service
        .signup("alice", "alice@example.com", PASSWORD)
        .await
        .unwrap();
    let original = h.notifier.last_token();

    h.service
        .resend_verification("alice@example.com")
        .await
        .unwrap();
    let reissued = h.notifier.last_token();
    assert_ne!(original, reissued);
    assert_eq!(h.notifier.count(), 2);

    let user_id = h.user_id("alice").await;
    let tokens = h.store.tokens_for_user(&user_id).await;
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].token, reissued);

    let err = h.service.verify_account(&original).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    h.service.verify_account(&reissued).await.unwrap();
    assert!(h.is_enabled("alice").await);
}

#[tokio::test]
async fn test_resend_is_silent_for_unknown_or_enabled() {
    let h = harness();
    h.register_and_verify("alice", "alice@example.com").await;
    let sent = h.notifier.count();

    h.service
        .resend_verification("nobody@example.com")
        .await
        .unwrap();
    h.service
        .resend_verification("alice@example.com")
        .await
        .unwrap();
    assert_eq!(h.notifier.count(), sent);

    let err = h.service.resend_verification("garbage").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}
