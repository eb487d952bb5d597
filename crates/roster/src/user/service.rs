//! User service for business logic.

use anyhow::{Context, Result, bail};
use tracing::{info, instrument, warn};

use super::models::{CreateUserRequest, SearchQuery, UpdateUserRequest, User, UserRole};
use super::repository::UserRepository;

/// Service for user management operations.
#[derive(Debug, Clone)]
pub struct UserService {
    repo: UserRepository,
    /// Failed login attempts after which an account is locked.
    lockout_threshold: i64,
}

impl UserService {
    /// Create a new user service.
    pub fn new(repo: UserRepository, lockout_threshold: i64) -> Self {
        Self {
            repo,
            lockout_threshold,
        }
    }

    /// Self-service registration.
    ///
    /// The very first account becomes a verified `ADMIN` so a fresh
    /// deployment can be administered at all. Everyone else starts as
    /// `ANONYMOUS` with a verification token; the caller is responsible for
    /// mailing it.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register_user(&self, mut request: CreateUserRequest) -> Result<User> {
        self.validate_new_user(&request).await?;
        request.password = hash_password(&request.password)?;

        let first_user = self.repo.count().await? == 0;
        let user = if first_user {
            request.role = Some(UserRole::Admin);
            self.repo.create(request, true, None).await?
        } else {
            request.role = Some(UserRole::Anonymous);
            let token = generate_verification_token();
            self.repo.create(request, false, Some(&token)).await?
        };

        info!(user_id = %user.id, role = %user.role, "Registered new user");
        Ok(user)
    }

    /// Administrative user creation.
    ///
    /// The role may be set by the caller; the account still has to verify
    /// its email before it can log in.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create_user(&self, mut request: CreateUserRequest) -> Result<User> {
        self.validate_new_user(&request).await?;
        request.password = hash_password(&request.password)?;

        let token = generate_verification_token();
        let user = self.repo.create(request, false, Some(&token)).await?;

        info!(user_id = %user.id, role = %user.role, "Created new user");
        Ok(user)
    }

    /// Get a user by ID.
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.repo.get(id).await
    }

    /// Get a user by email.
    #[instrument(skip(self))]
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.repo.get_by_email(email).await
    }

    /// Search users with filters and pagination.
    #[instrument(skip(self))]
    pub async fn search_users(&self, query: &SearchQuery) -> Result<(Vec<User>, i64)> {
        self.repo.search(query).await
    }

    /// List users, newest first.
    #[instrument(skip(self))]
    pub async fn list_users(&self, page: i64, size: i64) -> Result<(Vec<User>, i64)> {
        self.repo.list(page, size).await
    }

    /// Update a user.
    #[instrument(skip(self, request))]
    pub async fn update_user(&self, id: &str, request: UpdateUserRequest) -> Result<User> {
        if let Some(email) = &request.email {
            if !is_valid_email(email) {
                bail!("Invalid email format.");
            }
            if let Some(existing) = self.repo.get_by_email(email).await? {
                if existing.id != id {
                    bail!("Email '{}' is already registered.", email);
                }
            }
        }

        if let Some(nickname) = &request.nickname {
            if !is_valid_nickname(nickname) {
                bail!(
                    "Invalid nickname format. Must be 3-50 alphanumeric characters, underscores, or hyphens."
                );
            }
            if let Some(existing) = self.repo.get_by_nickname(nickname).await? {
                if existing.id != id {
                    bail!("Nickname '{}' is already taken.", nickname);
                }
            }
        }

        let mut processed_request = request;
        if let Some(password) = &processed_request.password {
            if password.len() < 8 {
                bail!("Password must be at least 8 characters.");
            }
            processed_request.password = Some(hash_password(password)?);
        }

        let user = self.repo.update(id, processed_request).await?;
        info!(user_id = %user.id, "Updated user");

        Ok(user)
    }

    /// Delete a user.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: &str) -> Result<()> {
        let user = self.repo.get(id).await?;
        if user.is_none() {
            bail!("User not found: {}", id);
        }

        self.repo.delete(id).await?;
        info!(user_id = %id, "Deleted user");

        Ok(())
    }

    /// Verify login credentials.
    ///
    /// Returns the user on success, `None` on bad credentials or an
    /// unverified email address. A locked account is an error so callers can
    /// tell it apart from a plain rejection. Failed password attempts count
    /// toward the lockout threshold.
    #[instrument(skip(self, password))]
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.repo.get_by_email(email).await? else {
            return Ok(None);
        };

        if user.is_locked {
            bail!("Account locked due to too many failed login attempts.");
        }

        if !verify_password(password, &user.password_hash)? {
            self.repo
                .record_failed_login(&user.id, self.lockout_threshold)
                .await?;
            warn!(user_id = %user.id, "Failed login attempt");
            return Ok(None);
        }

        if !user.email_verified {
            warn!(user_id = %user.id, "Login rejected for unverified email");
            return Ok(None);
        }

        self.repo.mark_login_success(&user.id).await?;
        Ok(Some(user))
    }

    /// Consume an email verification token.
    #[instrument(skip(self, token))]
    pub async fn verify_email(&self, user_id: &str, token: &str) -> Result<bool> {
        let verified = self.repo.verify_email(user_id, token).await?;
        if verified {
            info!(user_id = %user_id, "Email verified");
        }
        Ok(verified)
    }

    /// Shared validation for registration and admin creation.
    async fn validate_new_user(&self, request: &CreateUserRequest) -> Result<()> {
        if !is_valid_email(&request.email) {
            bail!("Invalid email format.");
        }

        if request.password.len() < 8 {
            bail!("Password must be at least 8 characters.");
        }

        if let Some(nickname) = &request.nickname {
            if !is_valid_nickname(nickname) {
                bail!(
                    "Invalid nickname format. Must be 3-50 alphanumeric characters, underscores, or hyphens."
                );
            }
            if !self.repo.is_nickname_available(nickname).await? {
                bail!("Nickname '{}' is already taken.", nickname);
            }
        }

        if !self.repo.is_email_available(&request.email).await? {
            bail!("Email '{}' is already registered.", request.email);
        }

        Ok(())
    }
}

/// Validate nickname format.
fn is_valid_nickname(nickname: &str) -> bool {
    let len = nickname.len();
    if !(3..=50).contains(&len) {
        return false;
    }

    nickname
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Basic email validation.
fn is_valid_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }
    !parts[0].is_empty() && parts[1].contains('.')
}

/// Hash a password using bcrypt.
fn hash_password(password: &str) -> Result<String> {
    // Lower cost factor keeps the test suite fast
    let cost = if cfg!(debug_assertions) { 4 } else { 10 };
    bcrypt::hash(password, cost).context("Failed to hash password")
}

/// Verify a password against a bcrypt hash.
fn verify_password(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash).context("Failed to verify password")
}

/// Generate an email verification token.
fn generate_verification_token() -> String {
    nanoid::nanoid!(24, &nanoid::alphabet::SAFE)
}
