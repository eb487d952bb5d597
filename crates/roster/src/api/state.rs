//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::AuthState;
use crate::mailer::EmailSender;
use crate::user::UserService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// User service for user management.
    pub users: Arc<UserService>,
    /// Authentication state.
    pub auth: AuthState,
    /// Outbound email sender.
    pub mailer: Arc<dyn EmailSender>,
}

impl AppState {
    /// Create new application state.
    pub fn new(users: UserService, auth: AuthState, mailer: Arc<dyn EmailSender>) -> Self {
        Self {
            users: Arc::new(users),
            auth,
            mailer,
        }
    }
}
