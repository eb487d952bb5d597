//! Roster library.
//!
//! Core components of the user-management service: persistence, domain
//! logic, authentication, outbound mail and the HTTP API.

pub mod api;
pub mod auth;
pub mod db;
pub mod mailer;
pub mod user;
