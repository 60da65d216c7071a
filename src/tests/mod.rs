//! Integration and unit tests for the LearnDev backend.
//!
//! ## Test Modules
//!
//! - **api_tests**: Signup/login/user/challenge flows over the full router
//! - **rate_limit_api_tests**: Rate-limit middleware behaviour over HTTP
//! - **error_tests**: Error handling and response rendering tests
//! - **config_tests**: Configuration loading and validation tests
//! - **db_tests**: Database schema and constraint tests
//! - **health_api_tests**: Health check endpoint tests

pub mod config_tests;
pub mod db_tests;
pub mod rate_limit_api_tests;
