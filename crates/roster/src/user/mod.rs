//! User management module.
//!
//! Models, repository and service for user records: registration, lockout
//! accounting, email verification, CRUD and the public search.

mod models;
mod repository;
mod service;

pub use models::{
    AdminUser, CreateUserRequest, PublicUser, SearchQuery, SortField, SortOrder,
    UpdateUserRequest, User, UserRole,
};
pub use repository::UserRepository;
pub use service::UserService;
