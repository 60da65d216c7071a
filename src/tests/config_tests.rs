#[cfg(test)]
mod tests {
    use crate::config::{self, AppConfig};
    use std::env;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "sqlite://data/learndev.db");
        assert_eq!(config.rate_limit.requests_limit, 100);
        assert_eq!(config.rate_limit.time_window, 60);
        assert_eq!(config.auth.access_token_expire_secs, 900);
        assert_eq!(config.auth.refresh_token_expire_secs, 1_296_000);
        assert!(!config.auth.secure_cookies);
    }

    // Environment manipulation is process-global, so every env-dependent
    // case lives in this one test to keep the suite parallel-safe.
    #[test]
    fn test_load_env_overrides_and_validation() {
        let result = config::load();
        assert!(result.is_ok());

        env::set_var("LEARNDEV__SERVER__PORT", "3000");
        env::set_var("LEARNDEV__RATE_LIMIT__REQUESTS_LIMIT", "7");
        env::set_var("LEARNDEV__RATE_LIMIT__TIME_WINDOW", "120");
        let config = config::load().unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.rate_limit.requests_limit, 7);
        assert_eq!(config.rate_limit.time_window, 120);

        env::set_var("LEARNDEV__RATE_LIMIT__REQUESTS_LIMIT", "0");
        let result = config::load();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("requests_limit"));

        env::set_var("LEARNDEV__RATE_LIMIT__REQUESTS_LIMIT", "7");
        env::set_var("LEARNDEV__RATE_LIMIT__TIME_WINDOW", "0");
        let result = config::load();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("time_window"));

        env::set_var("LEARNDEV__RATE_LIMIT__TIME_WINDOW", "120");
        env::set_var("LEARNDEV__SERVER__PORT", "0");
        let result = config::load();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("invalid server.port"));

        env::set_var("LEARNDEV__SERVER__PORT", "3000");
        env::set_var("LEARNDEV__AUTH__SECRET_KEY", "");
        let result = config::load();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("secret_key"));

        env::remove_var("LEARNDEV__SERVER__PORT");
        env::remove_var("LEARNDEV__RATE_LIMIT__REQUESTS_LIMIT");
        env::remove_var("LEARNDEV__RATE_LIMIT__TIME_WINDOW");
        env::remove_var("LEARNDEV__AUTH__SECRET_KEY");
    }

    #[test]
    fn test_ensure_sqlite_parent_dir_creates_directories() {
        let temp = tempfile::TempDir::new().unwrap();
        let url = format!("sqlite://{}/nested/dir/learndev.db", temp.path().display());
        config::ensure_sqlite_parent_dir(&url).unwrap();
        assert!(temp.path().join("nested/dir").is_dir());
    }

    #[test]
    fn test_ensure_sqlite_parent_dir_ignores_non_sqlite_urls() {
        assert!(config::ensure_sqlite_parent_dir("postgres://localhost/learndev").is_ok());
    }
}
