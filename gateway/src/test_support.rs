//! 单元测试共用的装配

use std::sync::{Arc, Mutex};

use agora_auth_core::{Argon2PasswordHasher, TokenService};
use agora_errors::AppResult;
use agora_identity::application::{AuthDependencies, AuthService};
use agora_identity::domain::notification::{Notifier, VerificationNotice};
use agora_identity::infrastructure::persistence::memory::MemoryStore;
use chrono::Duration;

use crate::state::AppState;

pub const PASSWORD: &str = "correct horse battery";

#[derive(Default)]
pub struct MockNotifier {
    pub notices: Mutex<Vec<VerificationNotice>>,
}

impl Notifier for MockNotifier {
    fn notify(&self, notice: VerificationNotice) -> AppResult<()> {
        self.notices.lock().unwrap().push(notice);
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub notifier: Arc<MockNotifier>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let notifier = Arc::new(MockNotifier::default());

        let auth = AuthService::new(
            AuthDependencies {
                users: store.users(),
                uow_factory: Arc::new(store),
                hasher: Arc::new(Argon2PasswordHasher::with_params(1024, 1, 1).unwrap()),
                token_service: TokenService::new(
                    "gateway-test-signing-secret-0123456789",
                    Duration::minutes(15),
                    "agora",
                ),
                notifier: notifier.clone(),
            },
            Duration::hours(24),
        )
        .unwrap();

        Self {
            state: AppState::new(Arc::new(auth)),
            notifier,
        }
    }

    /// 注册并激活一个账户
    pub async fn enabled_user(&self, username: &str) {
        self.state
            .auth
            .signup(username, &format!("{}@example.com", username), PASSWORD)
            .await
            .unwrap();
        let token = self.notifier.notices.lock().unwrap().last().unwrap().token.clone();
        self.state.auth.verify_account(&token).await.unwrap();
    }
}
