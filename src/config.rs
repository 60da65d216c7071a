use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub secret_key: String,
    pub access_token_expire_secs: i64,
    pub refresh_token_expire_secs: i64,
    /// Mark auth cookies `Secure`. Off by default for local development.
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Max requests per (client, route) key within one window.
    pub requests_limit: u32,
    /// Window length in seconds.
    pub time_window: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: Option<CorsConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        let defaults: &str = include_str!("../config/default.toml");
        match ::config::Config::builder()
            .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(app_cfg) => app_cfg,
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let defaults: &str = include_str!("../config/default.toml");
    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
        // Optional local file: learndev.toml (in CWD)
        .add_source(::config::File::with_name("learndev").required(false));

    if let Ok(custom_path) = std::env::var("LEARNDEV_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("LEARNDEV").separator("__"));

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Server
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    // Auth
    if cfg.auth.secret_key.is_empty() {
        return Err(anyhow::anyhow!("auth.secret_key must not be empty"));
    }
    if cfg.auth.access_token_expire_secs <= 0 {
        return Err(anyhow::anyhow!("auth.access_token_expire_secs must be > 0"));
    }
    if cfg.auth.refresh_token_expire_secs <= 0 {
        return Err(anyhow::anyhow!("auth.refresh_token_expire_secs must be > 0"));
    }

    // Rate limiting
    if cfg.rate_limit.requests_limit == 0 {
        return Err(anyhow::anyhow!("rate_limit.requests_limit must be > 0"));
    }
    if cfg.rate_limit.time_window == 0 {
        return Err(anyhow::anyhow!("rate_limit.time_window must be > 0"));
    }

    Ok(())
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if let Some(path) = url.strip_prefix("sqlite://") {
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
