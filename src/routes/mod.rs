//! HTTP route handlers for the LearnDev API.
//!
//! Each sub-module handles one domain of the platform:
//!
//! - `auth`: signup, credentials login, token refresh, logout
//! - `challenges`: browsing, contributing, taking and submitting challenges
//! - `health`: health check and system status endpoints
//! - `users`: profile lookup and account updates

pub mod auth;
pub mod challenges;
pub mod health;
pub mod users;
