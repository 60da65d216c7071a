use std::net::SocketAddr;

use axum::http::HeaderValue;
use axum::middleware::from_fn_with_state;
use axum::{
    routing::{get, patch, post},
    Router,
};
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod middleware;
mod routes;
mod security;
mod state;
mod types;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging (stdout + daily file rotation under ./logs)
    std::fs::create_dir_all("logs").ok();
    let (stdout_nb, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let file_appender = tracing_appender::rolling::daily("logs", "learndev.log");
    let (file_nb, file_guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(stdout_nb))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_nb))
        .init();
    // Keep guards alive so the non-blocking writers flush on shutdown
    let _log_guards = (stdout_guard, file_guard);

    // Load configuration (embedded defaults -> learndev.toml -> env/.env)
    let app_cfg = config::load()?;

    // Prepare data dir (if sqlite)
    let db_url = &app_cfg.database.url;
    config::ensure_sqlite_parent_dir(db_url)?;
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        info!("Creating SQLite database at {}", db_url);
        Sqlite::create_database(db_url).await?;
    }
    let pool = SqlitePoolOptions::new()
        .max_connections(16)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                let _ = sqlx::query("PRAGMA foreign_keys=ON;").execute(&mut *conn).await;
                let _ = sqlx::query("PRAGMA busy_timeout=10000;").execute(&mut *conn).await;
                Ok(())
            })
        })
        .connect(db_url)
        .await?;

    // Initialize DB schema and seed topics
    db::init_db(&pool).await?;

    // App state (owns the rate limiter)
    let state = AppState::new(pool.clone(), app_cfg.clone());

    // CORS: explicit origins from config, headers/methods mirrored so
    // credentialed requests stay valid
    let origins: Vec<HeaderValue> = app_cfg
        .cors
        .as_ref()
        .map(|c| c.allow_origins.iter().filter_map(|o| o.parse().ok()).collect())
        .unwrap_or_default();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    let api = Router::new()
        .route("/", get(routes::health::api_root))
        .route("/auth/signup", post(routes::auth::signup))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh-token", post(routes::auth::refresh_token))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/user/me", get(routes::users::me))
        .route(
            "/user/check-username-availability/{username}",
            get(routes::users::check_username_availability),
        )
        .route("/user/update-user-info", patch(routes::users::update_user_info))
        .route("/user/{username}", get(routes::users::user_by_username))
        .route("/challenge/available", get(routes::challenges::available_challenges))
        .route("/challenge/view/{slug}", get(routes::challenges::view_challenge))
        .route("/challenge/create-new", post(routes::challenges::create_new_challenge))
        .route("/challenge/take-new", post(routes::challenges::take_challenge))
        .route(
            "/challenge/submit-challenge-solution",
            patch(routes::challenges::submit_challenge_solution),
        )
        .route("/challenge/taken-challenge-info", post(routes::challenges::taken_challenge_info))
        .route("/challenge/your-contributions", get(routes::challenges::your_contributions))
        .route("/challenge/topics", get(routes::challenges::get_topics))
        .route("/challenge/{username}/taken-all", get(routes::challenges::challenges_taken_by_user));

    let app = Router::new()
        .route("/healthz", get(routes::health::healthz))
        .route("/readyz", get(routes::health::readyz))
        .route("/version", get(routes::health::version))
        .nest("/api/v1", api)
        .with_state(state.clone())
        .layer(from_fn_with_state(state, middleware::rate_limit::rate_limit_middleware))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Server listen addr (from config)
    let port: u16 = app_cfg.server.port;
    let host: String = app_cfg.server.host.clone();
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid listen addr {}:{} - {}", host, port, e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("LearnDev API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received. Stopping server...");
}
