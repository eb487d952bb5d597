//! Test utilities and common setup.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;

use roster::api::{AppState, create_router};
use roster::auth::{AuthConfig, AuthState};
use roster::db::Database;
use roster::mailer::{EmailSender, LogMailer};
use roster::user::{CreateUserRequest, UserRepository, UserService};

/// Lockout threshold used by test apps; small so lockout tests stay short.
pub const TEST_LOCKOUT_THRESHOLD: i64 = 3;

/// Create a test AuthConfig with a JWT secret for testing.
fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: Some("test-secret-for-integration-tests-minimum-32-chars".to_string()),
        ..Default::default()
    }
}

fn registration(email: &str, nickname: &str) -> CreateUserRequest {
    CreateUserRequest {
        email: email.to_string(),
        password: "Secret*123".to_string(),
        nickname: Some(nickname.to_string()),
        first_name: None,
        last_name: None,
        bio: None,
        profile_picture_url: None,
        github_profile_url: None,
        linkedin_profile_url: None,
        role: None,
        is_professional: None,
    }
}

async fn build_state(mailer: Arc<dyn EmailSender>) -> (AppState, AuthState, Arc<UserService>) {
    let db = Database::in_memory().await.unwrap();

    let auth_state = AuthState::new(&test_auth_config()).unwrap();

    let user_repo = UserRepository::new(db.pool().clone());
    let user_service = UserService::new(user_repo, TEST_LOCKOUT_THRESHOLD);

    let state = AppState::new(user_service, auth_state.clone(), mailer);
    let users = state.users.clone();
    (state, auth_state, users)
}

/// Create a test application with all services initialized.
pub async fn test_app() -> Router {
    let (state, _, _) = build_state(Arc::new(LogMailer)).await;
    create_router(state)
}

/// Create a test application and return a valid token for a seeded admin.
///
/// The admin is the first registered user, so it is auto-verified. Its
/// credentials are `admin@roster.test` / `Secret*123`.
pub async fn test_app_with_token() -> (Router, String) {
    let (state, auth_state, users) = build_state(Arc::new(LogMailer)).await;

    let admin = users
        .register_user(registration("admin@roster.test", "admin"))
        .await
        .unwrap();
    let token = auth_state.generate_token(&admin).unwrap();

    (create_router(state), token)
}

/// Create a test application and return a token for a regular
/// (authenticated, non-elevated) user.
pub async fn test_app_with_user_token() -> (Router, String) {
    let (state, auth_state, users) = build_state(Arc::new(LogMailer)).await;

    // First registration grabs the admin seat; the second is a plain user.
    users
        .register_user(registration("admin@roster.test", "admin"))
        .await
        .unwrap();
    let pending = users
        .register_user(registration("user@roster.test", "regular"))
        .await
        .unwrap();

    let verification = pending.verification_token.clone().unwrap();
    users.verify_email(&pending.id, &verification).await.unwrap();
    let user = users.get_user(&pending.id).await.unwrap().unwrap();

    let token = auth_state.generate_token(&user).unwrap();

    (create_router(state), token)
}

/// A captured verification email.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub user_id: String,
    pub token: String,
}

/// In-memory mailbox capturing outbound verification emails.
#[derive(Debug, Default)]
pub struct TestMailbox {
    sent: Mutex<Vec<SentMail>>,
}

impl TestMailbox {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for TestMailbox {
    async fn send_verification(
        &self,
        to_email: &str,
        user_id: &str,
        token: &str,
    ) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(SentMail {
            to: to_email.to_string(),
            user_id: user_id.to_string(),
            token: token.to_string(),
        });
        Ok(())
    }
}

/// Create a test application whose outbound mail lands in the returned
/// mailbox.
pub async fn test_app_with_mailbox() -> (Router, Arc<TestMailbox>) {
    let mailbox = Arc::new(TestMailbox::default());
    let (state, _, _) = build_state(mailbox.clone()).await;
    (create_router(state), mailbox)
}
