#[cfg(test)]
mod tests {
    use sqlx::migrate::MigrateDatabase;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Row, SqlitePool};
    use tempfile::NamedTempFile;
    use uuid::Uuid;

    async fn setup_pool() -> (SqlitePool, NamedTempFile) {
        let temp_db = NamedTempFile::new().unwrap();
        let db_url = format!("sqlite:{}", temp_db.path().display());
        sqlx::Sqlite::create_database(&db_url).await.unwrap();
        let pool = SqlitePoolOptions::new().max_connections(1).connect(&db_url).await.unwrap();
        crate::db::init_db(&pool).await.unwrap();
        (pool, temp_db)
    }

    async fn insert_user(pool: &SqlitePool, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO users (id, first_name, username, email) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&id)
        .bind("Test")
        .bind(username)
        .bind(format!("{}@example.com", username))
        .execute(pool)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn test_init_db_is_idempotent() {
        let (pool, _db) = setup_pool().await;
        // Second run must neither fail nor duplicate seeded topics
        crate::db::init_db(&pool).await.unwrap();

        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM topics")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("n");
        assert_eq!(count, 8);
    }

    #[tokio::test]
    async fn test_username_must_be_unique() {
        let (pool, _db) = setup_pool().await;
        insert_user(&pool, "unique").await;

        let duplicate = sqlx::query(
            "INSERT INTO users (id, first_name, username, email) VALUES (?1, 'X', 'unique', 'other@example.com')",
        )
        .bind(Uuid::new_v4().to_string())
        .execute(&pool)
        .await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_challenge_requires_existing_contributor() {
        let (pool, _db) = setup_pool().await;

        let orphan = sqlx::query(
            r#"INSERT INTO challenges (id, title, slug, description, difficulty_tag, contributor_id)
               VALUES (?1, 'T', 't-slug', 'D', 'beginner', ?2)"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(Uuid::new_v4().to_string())
        .execute(&pool)
        .await;
        assert!(orphan.is_err());
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_to_challenges() {
        let (pool, _db) = setup_pool().await;
        let user_id = insert_user(&pool, "cascades").await;

        let challenge_id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"INSERT INTO challenges (id, title, slug, description, difficulty_tag, contributor_id)
               VALUES (?1, 'T', 't-slug', 'D', 'beginner', ?2)"#,
        )
        .bind(&challenge_id)
        .bind(&user_id)
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query("DELETE FROM users WHERE id = ?1").bind(&user_id).execute(&pool).await.unwrap();

        let remaining: i64 = sqlx::query("SELECT COUNT(*) AS n FROM challenges")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("n");
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_taker_row_defaults() {
        let (pool, _db) = setup_pool().await;
        let contributor = insert_user(&pool, "author").await;
        let taker = insert_user(&pool, "taker").await;

        let challenge_id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"INSERT INTO challenges (id, title, slug, description, difficulty_tag, contributor_id, approval)
               VALUES (?1, 'T', 't-slug', 'D', 'beginner', ?2, 'approved')"#,
        )
        .bind(&challenge_id)
        .bind(&contributor)
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query("INSERT INTO challenge_takers (user_id, challenge_id) VALUES (?1, ?2)")
            .bind(&taker)
            .bind(&challenge_id)
            .execute(&pool)
            .await
            .unwrap();

        let row = sqlx::query("SELECT status, created_at FROM challenge_takers WHERE user_id = ?1")
            .bind(&taker)
            .fetch_one(&pool)
            .await
            .unwrap();
        let status: String = row.get("status");
        let created_at: String = row.get("created_at");
        assert_eq!(status, "pending");
        assert!(created_at.ends_with('Z'));
    }
}
