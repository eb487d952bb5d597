//! User repository for database operations.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::models::{CreateUserRequest, SearchQuery, UpdateUserRequest, User};

/// Columns selected for full user records.
const USER_COLUMNS: &str = "id, email, nickname, first_name, last_name, bio, \
     profile_picture_url, github_profile_url, linkedin_profile_url, role, \
     is_professional, email_verified, verification_token, password_hash, \
     failed_login_attempts, is_locked, created_at, updated_at, last_login_at";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Generate a new user ID.
    fn generate_id() -> String {
        format!("usr_{}", nanoid::nanoid!(12))
    }

    /// Insert a new user.
    ///
    /// `request.password` must already be a bcrypt hash; hashing is the
    /// service layer's job. Verification state is decided by the caller.
    #[instrument(skip(self, request, verification_token), fields(email = %request.email))]
    pub async fn create(
        &self,
        request: CreateUserRequest,
        email_verified: bool,
        verification_token: Option<&str>,
    ) -> Result<User> {
        let id = Self::generate_id();
        let role = request.role.unwrap_or_default();

        debug!("Creating user: {} ({})", request.email, id);

        sqlx::query(
            r#"
            INSERT INTO users (id, email, nickname, first_name, last_name, bio,
                               profile_picture_url, github_profile_url, linkedin_profile_url,
                               role, is_professional, email_verified, verification_token,
                               password_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&request.email)
        .bind(&request.nickname)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.bio)
        .bind(&request.profile_picture_url)
        .bind(&request.github_profile_url)
        .bind(&request.linkedin_profile_url)
        .bind(role.to_string())
        .bind(request.is_professional.unwrap_or(false))
        .bind(email_verified)
        .bind(verification_token)
        .bind(&request.password)
        .execute(&self.pool)
        .await
        .context("Failed to insert user")?;

        self.get(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after creation"))
    }

    /// Get a user by ID.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")?;

        Ok(user)
    }

    /// Get a user by email.
    #[instrument(skip(self))]
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by email")?;

        Ok(user)
    }

    /// Get a user by nickname.
    #[instrument(skip(self))]
    pub async fn get_by_nickname(&self, nickname: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE nickname = ?",
            USER_COLUMNS
        ))
        .bind(nickname)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by nickname")?;

        Ok(user)
    }

    /// Search users with filters, sorting and pagination.
    ///
    /// Returns the page of matching records together with the count of all
    /// matches before pagination. The ORDER BY clause always carries `id` as
    /// a secondary key so pages stay stable when the sort column has
    /// duplicate values.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &SearchQuery) -> Result<(Vec<User>, i64)> {
        let mut filter = String::from(" FROM users WHERE 1=1");
        let mut bind_values: Vec<String> = Vec::new();

        if let Some(role) = &query.role {
            filter.push_str(" AND role = ?");
            bind_values.push(role.to_string());
        }

        if let Some(q) = query.q.as_deref().filter(|q| !q.is_empty()) {
            // OR across the text fields, NULL treated as empty.
            filter.push_str(
                " AND (LOWER(email) LIKE ? \
                  OR LOWER(COALESCE(first_name, '')) LIKE ? \
                  OR LOWER(COALESCE(last_name, '')) LIKE ? \
                  OR LOWER(COALESCE(bio, '')) LIKE ?)",
            );
            let pattern = format!("%{}%", q.to_lowercase());
            for _ in 0..4 {
                bind_values.push(pattern.clone());
            }
        }

        // Total is counted on the filtered set, before pagination.
        let count_sql = format!("SELECT COUNT(*){}", filter);
        let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql);
        for value in &bind_values {
            count_query = count_query.bind(value);
        }
        let (total,) = count_query
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")?;

        let select_sql = format!(
            "SELECT {}{} ORDER BY {} {}, id ASC LIMIT ? OFFSET ?",
            USER_COLUMNS,
            filter,
            query.sort.column(),
            query.order.sql()
        );
        let mut select_query = sqlx::query_as::<_, User>(&select_sql);
        for value in &bind_values {
            select_query = select_query.bind(value);
        }
        select_query = select_query.bind(query.size).bind(query.offset());

        let users = select_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to search users")?;

        Ok((users, total))
    }

    /// List users, newest first, with the total count.
    #[instrument(skip(self))]
    pub async fn list(&self, page: i64, size: i64) -> Result<(Vec<User>, i64)> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")?;

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?",
            USER_COLUMNS
        ))
        .bind(size)
        .bind((page - 1) * size)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users")?;

        Ok((users, total))
    }

    /// Update a user.
    ///
    /// `request.password`, when set, must already be a bcrypt hash.
    #[instrument(skip(self, request))]
    pub async fn update(&self, id: &str, request: UpdateUserRequest) -> Result<User> {
        let existing = self
            .get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found: {}", id))?;

        // Build update query dynamically
        let mut updates = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(email) = &request.email {
            updates.push("email = ?");
            values.push(email.clone());
        }

        if let Some(password) = &request.password {
            updates.push("password_hash = ?");
            values.push(password.clone());
        }

        if let Some(nickname) = &request.nickname {
            updates.push("nickname = ?");
            values.push(nickname.clone());
        }

        if let Some(first_name) = &request.first_name {
            updates.push("first_name = ?");
            values.push(first_name.clone());
        }

        if let Some(last_name) = &request.last_name {
            updates.push("last_name = ?");
            values.push(last_name.clone());
        }

        if let Some(bio) = &request.bio {
            updates.push("bio = ?");
            values.push(bio.clone());
        }

        if let Some(url) = &request.profile_picture_url {
            updates.push("profile_picture_url = ?");
            values.push(url.clone());
        }

        if let Some(url) = &request.github_profile_url {
            updates.push("github_profile_url = ?");
            values.push(url.clone());
        }

        if let Some(url) = &request.linkedin_profile_url {
            updates.push("linkedin_profile_url = ?");
            values.push(url.clone());
        }

        if let Some(role) = &request.role {
            updates.push("role = ?");
            values.push(role.to_string());
        }

        if let Some(is_professional) = request.is_professional {
            updates.push("is_professional = ?");
            values.push(if is_professional { "1" } else { "0" }.to_string());
        }

        if updates.is_empty() {
            return Ok(existing);
        }

        updates.push("updated_at = datetime('now')");

        let sql = format!("UPDATE users SET {} WHERE id = ?", updates.join(", "));

        let mut query_builder = sqlx::query(&sql);
        for value in &values {
            query_builder = query_builder.bind(value);
        }
        query_builder = query_builder.bind(id);

        query_builder
            .execute(&self.pool)
            .await
            .context("Failed to update user")?;

        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after update"))
    }

    /// Delete a user.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?;

        if result.rows_affected() == 0 {
            return Err(anyhow::anyhow!("User not found: {}", id));
        }

        Ok(())
    }

    /// Record a failed login attempt, locking the account when the threshold
    /// is reached. Atomic so concurrent failures cannot skip the lock.
    #[instrument(skip(self))]
    pub async fn record_failed_login(&self, id: &str, lock_threshold: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET failed_login_attempts = failed_login_attempts + 1,
                is_locked = CASE WHEN failed_login_attempts + 1 >= ? THEN 1 ELSE is_locked END
            WHERE id = ?
            "#,
        )
        .bind(lock_threshold)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to record login failure")?;

        Ok(())
    }

    /// Reset the failure counter and stamp the last login time.
    #[instrument(skip(self))]
    pub async fn mark_login_success(&self, id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE users SET failed_login_attempts = 0, last_login_at = datetime('now') WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to record login")?;

        Ok(())
    }

    /// Consume a verification token.
    ///
    /// On a match the account becomes verified, the token is cleared and an
    /// `ANONYMOUS` role is promoted to `AUTHENTICATED`. Returns whether a
    /// token was consumed.
    #[instrument(skip(self, token))]
    pub async fn verify_email(&self, id: &str, token: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verified = 1,
                verification_token = NULL,
                role = CASE WHEN role = 'ANONYMOUS' THEN 'AUTHENTICATED' ELSE role END,
                updated_at = datetime('now')
            WHERE id = ? AND verification_token = ?
            "#,
        )
        .bind(id)
        .bind(token)
        .execute(&self.pool)
        .await
        .context("Failed to verify email")?;

        Ok(result.rows_affected() > 0)
    }

    /// Check if an email is available.
    #[instrument(skip(self))]
    pub async fn is_email_available(&self, email: &str) -> Result<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check email availability")?;

        Ok(count.0 == 0)
    }

    /// Check if a nickname is available.
    #[instrument(skip(self))]
    pub async fn is_nickname_available(&self, nickname: &str) -> Result<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE nickname = ?")
            .bind(nickname)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check nickname availability")?;

        Ok(count.0 == 0)
    }

    /// Count total users.
    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")?;

        Ok(count.0)
    }
}
