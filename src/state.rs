use std::sync::Arc;

use crate::config::AppConfig;
use crate::middleware::RateLimiter;

/// The shared application state.
///
/// Cloned into every handler and middleware through Axum's state
/// extraction. Holds the database pool, the configuration, and the
/// process-wide rate limiter instance, constructed explicitly here rather
/// than living in a global.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection pool.
    pub db: sqlx::SqlitePool,
    /// Application configuration, fixed for process lifetime.
    pub config: Arc<AppConfig>,
    /// Fixed-window rate limiter gating every inbound request.
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Self {
        let rate_limiter =
            RateLimiter::new(config.rate_limit.requests_limit, config.rate_limit.time_window);
        Self { db, config: Arc::new(config), rate_limiter }
    }
}
