#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use sqlx::migrate::MigrateDatabase;
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    use crate::config::{
        AppConfig, AuthConfig, DatabaseConfig, RateLimitConfig, ServerConfig,
    };
    use crate::middleware::rate_limit::rate_limit_middleware;
    use crate::routes;
    use crate::state::AppState;

    fn test_config(db_url: String, requests_limit: u32, time_window: u64) -> AppConfig {
        AppConfig {
            server: ServerConfig { host: "127.0.0.1".to_string(), port: 8080 },
            database: DatabaseConfig { url: db_url },
            auth: AuthConfig {
                secret_key: "test-secret-key".to_string(),
                access_token_expire_secs: 900,
                refresh_token_expire_secs: 86400,
                secure_cookies: false,
            },
            rate_limit: RateLimitConfig { requests_limit, time_window },
            cors: None,
        }
    }

    /// Router with the limiter layered exactly as in `main`: two routes so
    /// key isolation between paths can be observed.
    async fn setup_limited_app(
        requests_limit: u32,
        time_window: u64,
    ) -> (axum::Router, NamedTempFile) {
        let temp_db = NamedTempFile::new().unwrap();
        let db_url = format!("sqlite:{}", temp_db.path().display());
        sqlx::Sqlite::create_database(&db_url).await.unwrap();
        let pool = SqlitePoolOptions::new().max_connections(1).connect(&db_url).await.unwrap();
        crate::db::init_db(&pool).await.unwrap();

        let state = AppState::new(pool, test_config(db_url, requests_limit, time_window));
        let app = axum::Router::new()
            .route("/healthz", get(routes::health::healthz))
            .route("/version", get(routes::health::version))
            .with_state(state.clone())
            .layer(from_fn_with_state(state, rate_limit_middleware));
        (app, temp_db)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn get_request_from(uri: &str, client: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-forwarded-for", client)
            .body(Body::empty())
            .unwrap()
    }

    fn header_u64(response: &axum::response::Response, name: &str) -> u64 {
        response.headers().get(name).unwrap().to_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_admitted_responses_carry_quota_headers() {
        let (app, _db) = setup_limited_app(5, 60).await;

        let response = app.clone().oneshot(get_request("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_u64(&response, "x-ratelimit-limit"), 5);
        assert_eq!(header_u64(&response, "x-ratelimit-remaining"), 4);
        assert_eq!(header_u64(&response, "x-ratelimit-reset"), 60);

        let response = app.oneshot(get_request("/healthz")).await.unwrap();
        assert_eq!(header_u64(&response, "x-ratelimit-remaining"), 3);
    }

    #[tokio::test]
    async fn test_denial_returns_429_with_headers() {
        let (app, _db) = setup_limited_app(2, 60).await;

        for _ in 0..2 {
            let response = app.clone().oneshot(get_request("/healthz")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.oneshot(get_request("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(header_u64(&response, "x-ratelimit-limit"), 2);
        assert_eq!(header_u64(&response, "x-ratelimit-remaining"), 0);
        assert!(header_u64(&response, "x-ratelimit-reset") > 0);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "RATE_LIMITED");
        assert_eq!(json["status"], 429);
    }

    #[tokio::test]
    async fn test_routes_are_isolated_buckets() {
        let (app, _db) = setup_limited_app(1, 60).await;

        let response = app.clone().oneshot(get_request("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = app.clone().oneshot(get_request("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        // A different path is a different key and is still admitted
        let response = app.oneshot(get_request("/version")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_clients_are_isolated_buckets() {
        let (app, _db) = setup_limited_app(1, 60).await;

        let response =
            app.clone().oneshot(get_request_from("/healthz", "203.0.113.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response =
            app.clone().oneshot(get_request_from("/healthz", "203.0.113.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = app.oneshot(get_request_from("/healthz", "203.0.113.2")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_concurrent_requests_admit_exactly_limit() {
        let limit = 4u32;
        let total = 24u32;
        let (app, _db) = setup_limited_app(limit, 60).await;

        let mut handles = Vec::new();
        for _ in 0..total {
            let app = app.clone();
            handles.push(tokio::spawn(async move {
                app.oneshot(get_request("/healthz")).await.unwrap().status()
            }));
        }

        let mut admitted = 0u32;
        let mut denied = 0u32;
        for handle in handles {
            match handle.await.unwrap() {
                StatusCode::OK => admitted += 1,
                StatusCode::TOO_MANY_REQUESTS => denied += 1,
                other => panic!("unexpected status {}", other),
            }
        }
        assert_eq!(admitted, limit);
        assert_eq!(denied, total - limit);
    }
}
