//! User data models and view projections.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User role.
///
/// Stored and serialized by name (`ANONYMOUS`, `AUTHENTICATED`, `MANAGER`,
/// `ADMIN`). New accounts start as `Anonymous` and are promoted to
/// `Authenticated` once their email address is verified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    /// Registered but not yet email-verified.
    #[default]
    Anonymous,
    /// Verified regular user.
    Authenticated,
    /// Elevated user with user-management access.
    Manager,
    /// Administrator.
    Admin,
}

impl UserRole {
    /// Whether this role grants access to user-management endpoints.
    pub fn is_elevated(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UserRole::Anonymous => "ANONYMOUS",
            UserRole::Authenticated => "AUTHENTICATED",
            UserRole::Manager => "MANAGER",
            UserRole::Admin => "ADMIN",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ANONYMOUS" => Ok(UserRole::Anonymous),
            "AUTHENTICATED" => Ok(UserRole::Authenticated),
            "MANAGER" => Ok(UserRole::Manager),
            "ADMIN" => Ok(UserRole::Admin),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

impl TryFrom<String> for UserRole {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A user record as stored in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub nickname: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub github_profile_url: Option<String>,
    pub linkedin_profile_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: UserRole,
    pub is_professional: bool,
    pub email_verified: bool,
    pub verification_token: Option<String>,
    pub password_hash: String,
    pub failed_login_attempts: i64,
    pub is_locked: bool,
    pub created_at: String,
    pub updated_at: String,
    pub last_login_at: Option<String>,
}

/// Request to create a new user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub nickname: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub github_profile_url: Option<String>,
    pub linkedin_profile_url: Option<String>,
    pub role: Option<UserRole>,
    pub is_professional: Option<bool>,
}

/// Request to update a user (partial).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub nickname: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub github_profile_url: Option<String>,
    pub linkedin_profile_url: Option<String>,
    pub role: Option<UserRole>,
    pub is_professional: Option<bool>,
}

/// Sort key for user search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    Email,
    Nickname,
    LastName,
}

impl SortField {
    /// The backing column. Keeping this a closed mapping is what makes the
    /// ORDER BY clause safe to assemble from request input.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Email => "email",
            SortField::Nickname => "nickname",
            SortField::LastName => "last_name",
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(SortField::CreatedAt),
            "email" => Ok(SortField::Email),
            "nickname" => Ok(SortField::Nickname),
            "last_name" => Ok(SortField::LastName),
            _ => Err(format!("unknown sort field: {}", s)),
        }
    }
}

/// Sort direction for user search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(format!("unknown sort order: {}", s)),
        }
    }
}

fn default_page() -> i64 {
    1
}

fn default_size() -> i64 {
    10
}

/// Search parameters for the user listing.
///
/// `page` and `size` must be range-checked with [`SearchQuery::validate`]
/// before the query reaches the repository. `sort` and `order` are closed
/// enums, so values outside the allowed sets are rejected at parameter
/// binding and never reach the SQL layer.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    /// Free text matched against email, first name, last name and bio.
    pub q: Option<String>,
    /// Exact role filter.
    pub role: Option<UserRole>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
    #[serde(default)]
    pub sort: SortField,
    #[serde(default)]
    pub order: SortOrder,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            q: None,
            role: None,
            page: default_page(),
            size: default_size(),
            sort: SortField::default(),
            order: SortOrder::default(),
        }
    }
}

impl SearchQuery {
    /// Fail-fast range checks. Must hold before the repository is called.
    pub fn validate(&self) -> Result<(), String> {
        if self.page < 1 {
            return Err("page must be >= 1".to_string());
        }
        if !(1..=100).contains(&self.size) {
            return Err("size must be between 1 and 100".to_string());
        }
        Ok(())
    }

    /// Row offset for the requested page.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.size
    }
}

/// Minimum display length for nicknames in public responses.
const NICKNAME_MIN_LEN: usize = 3;

/// Right-pad a nickname with `_` up to the minimum display length.
///
/// This satisfies a downstream display constraint only; the stored record is
/// never modified.
fn pad_nickname(nickname: Option<&str>) -> String {
    let mut padded = nickname.unwrap_or_default().to_string();
    while padded.chars().count() < NICKNAME_MIN_LEN {
        padded.push('_');
    }
    padded
}

/// Public projection of a user, returned by the unauthenticated search.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub nickname: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub github_profile_url: Option<String>,
    pub linkedin_profile_url: Option<String>,
    pub role: UserRole,
    pub is_professional: bool,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            nickname: pad_nickname(user.nickname.as_deref()),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            bio: user.bio.clone(),
            profile_picture_url: user.profile_picture_url.clone(),
            github_profile_url: user.github_profile_url.clone(),
            linkedin_profile_url: user.linkedin_profile_url.clone(),
            role: user.role,
            is_professional: user.is_professional,
        }
    }
}

/// Administrative projection of a user, returned by authenticated endpoints.
///
/// Carries the raw nickname (possibly short or absent) and no profile URLs.
/// Kept separate from [`PublicUser`] so fields cannot silently leak between
/// trust levels.
#[derive(Debug, Clone, Serialize)]
pub struct AdminUser {
    pub id: String,
    pub email: String,
    pub role: UserRole,
    pub nickname: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

impl From<User> for AdminUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            nickname: user.nickname,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
        }
    }
}
