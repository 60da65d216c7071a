use sqlx::SqlitePool;
use uuid::Uuid;

/// Topics available for tagging challenges. Seeded idempotently at startup.
const SEED_TOPICS: &[&str] =
    &["frontend", "backend", "fullstack", "api", "database", "devops", "testing", "security"];

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    // Pragmas for better durability/performance
    if let Err(e) = sqlx::query("PRAGMA journal_mode=WAL;").execute(pool).await {
        tracing::warn!("Failed to set WAL journal mode: {}", e);
    }
    if let Err(e) = sqlx::query("PRAGMA synchronous=NORMAL;").execute(pool).await {
        tracing::warn!("Failed to set synchronous mode: {}", e);
    }
    // Foreign keys are critical - fail if this doesn't work
    sqlx::query("PRAGMA foreign_keys=ON;").execute(pool).await?;
    if let Err(e) = sqlx::query("PRAGMA busy_timeout=10000;").execute(pool).await {
        tracing::warn!("Failed to set busy_timeout: {}", e);
    }

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NULL,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL DEFAULT 'user',
            password TEXT NULL,
            is_email_verified INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            provider TEXT NOT NULL DEFAULT 'credentials',
            blocked INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS profiles (
            user_id TEXT PRIMARY KEY,
            about TEXT NULL,
            image_url TEXT NULL,
            updated_at TEXT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS login_histories (
            user_id TEXT NOT NULL,
            last_logged_in TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            PRIMARY KEY(user_id, last_logged_in),
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS topics (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS challenges (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL,
            difficulty_tag TEXT NOT NULL,
            contributor_id TEXT NOT NULL,
            approval TEXT NOT NULL DEFAULT 'pending',
            approver_id TEXT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            updated_at TEXT NULL,
            FOREIGN KEY(contributor_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(approver_id) REFERENCES users(id) ON DELETE SET NULL
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS challenge_topics (
            challenge_id TEXT NOT NULL,
            topic_id TEXT NOT NULL,
            PRIMARY KEY(challenge_id, topic_id),
            FOREIGN KEY(challenge_id) REFERENCES challenges(id) ON DELETE CASCADE,
            FOREIGN KEY(topic_id) REFERENCES topics(id) ON DELETE RESTRICT
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS challenge_takers (
            user_id TEXT NOT NULL,
            challenge_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            github_url TEXT NULL,
            presentation_video_url TEXT NULL,
            deployed_application_url TEXT NULL,
            feedback TEXT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            updated_at TEXT NULL,
            PRIMARY KEY(user_id, challenge_id),
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(challenge_id) REFERENCES challenges(id) ON DELETE RESTRICT
        )"#,
    )
    .execute(pool)
    .await?;

    let indexes = [
        ("idx_users_username", "CREATE INDEX IF NOT EXISTS idx_users_username ON users(username)"),
        ("idx_users_email", "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)"),
        (
            "idx_challenges_approval_created",
            "CREATE INDEX IF NOT EXISTS idx_challenges_approval_created ON challenges(approval, created_at DESC)",
        ),
        (
            "idx_challenges_contributor",
            "CREATE INDEX IF NOT EXISTS idx_challenges_contributor ON challenges(contributor_id)",
        ),
        (
            "idx_challenge_takers_user",
            "CREATE INDEX IF NOT EXISTS idx_challenge_takers_user ON challenge_takers(user_id)",
        ),
        (
            "idx_challenge_topics_topic",
            "CREATE INDEX IF NOT EXISTS idx_challenge_topics_topic ON challenge_topics(topic_id)",
        ),
        (
            "idx_login_histories_user",
            "CREATE INDEX IF NOT EXISTS idx_login_histories_user ON login_histories(user_id)",
        ),
    ];

    for (name, query) in indexes {
        if let Err(e) = sqlx::query(query).execute(pool).await {
            match &e {
                sqlx::Error::Database(db_err) => {
                    let msg = db_err.message().to_lowercase();
                    if msg.contains("already exists") || msg.contains("duplicate") {
                        tracing::debug!("Index {} already exists, skipping", name);
                    } else {
                        tracing::warn!("Failed to create index {}: {}", name, e);
                    }
                }
                _ => {
                    tracing::warn!("Failed to create index {}: {}", name, e);
                }
            }
        }
    }

    seed_topics(pool).await?;

    Ok(())
}

async fn seed_topics(pool: &SqlitePool) -> anyhow::Result<()> {
    for name in SEED_TOPICS {
        sqlx::query("INSERT INTO topics (id, name) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING")
            .bind(Uuid::new_v4().to_string())
            .bind(name)
            .execute(pool)
            .await?;
    }
    Ok(())
}
