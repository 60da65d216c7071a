use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, OptionExt},
    middleware::auth::{AuthUser, MaybeAuthUser},
    routes::users::get_user_by_username,
    state::AppState,
    types::{
        ApprovalStatus, ChallengeInfo, ChallengeOutput, ChallengeSolutionInput, ChallengeStatus,
        ChallengeTaken, ContributedChallengeInfo, ContributorDto, DifficultyTag, NewChallengeInput,
        PaginatedChallengeInfo, TakeChallengeRequest, TakenChallengeState, TopicDto,
        ViewChallengeOutput,
    },
};

const CHALLENGE_SELECT: &str = r#"SELECT c.id, c.title, c.slug, c.description, c.difficulty_tag,
       c.approval, c.contributor_id, c.created_at, c.updated_at,
       u.username AS contributor_username,
       u.first_name AS contributor_first_name,
       u.last_name AS contributor_last_name
  FROM challenges c JOIN users u ON u.id = c.contributor_id"#;

/// ASCII slug from a challenge title. The stored slug additionally carries
/// the challenge id as a uniqueness suffix.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(ch.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    slug
}

async fn topics_for_challenge(db: &SqlitePool, challenge_id: &str) -> AppResult<Vec<TopicDto>> {
    let rows = sqlx::query(
        r#"SELECT t.id, t.name FROM topics t
           JOIN challenge_topics ct ON ct.topic_id = t.id
           WHERE ct.challenge_id = ?1 ORDER BY t.name"#,
    )
    .bind(challenge_id)
    .fetch_all(db)
    .await?;

    rows.iter()
        .map(|row| {
            let id: String = row.try_get("id")?;
            Ok(TopicDto {
                id: Uuid::parse_str(&id)
                    .map_err(|_| AppError::Database(format!("invalid topic id '{}'", id)))?,
                name: row.try_get("name")?,
            })
        })
        .collect()
}

fn parse_uuid_column(value: &str, what: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| AppError::Database(format!("invalid {} '{}'", what, value)))
}

async fn challenge_info_from_row(db: &SqlitePool, row: &SqliteRow) -> AppResult<ChallengeInfo> {
    let id: String = row.try_get("id")?;
    let difficulty: String = row.try_get("difficulty_tag")?;
    let contributor_id: String = row.try_get("contributor_id")?;

    Ok(ChallengeInfo {
        id: parse_uuid_column(&id, "challenge id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        difficulty_tag: DifficultyTag::parse(&difficulty)
            .ok_or_else(|| AppError::Database(format!("unknown difficulty '{}'", difficulty)))?,
        topic_tags: topics_for_challenge(db, &id).await?,
        contributor: ContributorDto {
            id: parse_uuid_column(&contributor_id, "contributor id")?,
            username: row.try_get("contributor_username")?,
            first_name: row.try_get("contributor_first_name")?,
            last_name: row.try_get("contributor_last_name")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn challenge_output_from_row(db: &SqlitePool, row: &SqliteRow) -> AppResult<ChallengeOutput> {
    Ok(ChallengeOutput {
        info: challenge_info_from_row(db, row).await?,
        description: row.try_get("description")?,
    })
}

fn approval_from_row(row: &SqliteRow) -> AppResult<ApprovalStatus> {
    let approval: String = row.try_get("approval")?;
    ApprovalStatus::parse(&approval)
        .ok_or_else(|| AppError::Database(format!("unknown approval status '{}'", approval)))
}

fn taker_state_from_row(row: &SqliteRow) -> AppResult<TakenChallengeState> {
    let user_id: String = row.try_get("user_id")?;
    let challenge_id: String = row.try_get("challenge_id")?;
    let status: String = row.try_get("status")?;
    Ok(TakenChallengeState {
        user_id: parse_uuid_column(&user_id, "user id")?,
        challenge_id: parse_uuid_column(&challenge_id, "challenge id")?,
        status: ChallengeStatus::parse(&status)
            .ok_or_else(|| AppError::Database(format!("unknown challenge status '{}'", status)))?,
        github_url: row.try_get("github_url")?,
        presentation_video_url: row.try_get("presentation_video_url")?,
        deployed_application_url: row.try_get("deployed_application_url")?,
        feedback: row.try_get("feedback")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn taker_state(
    db: &SqlitePool,
    user_id: Uuid,
    challenge_id: Uuid,
) -> AppResult<Option<TakenChallengeState>> {
    let row = sqlx::query(
        "SELECT * FROM challenge_takers WHERE user_id = ?1 AND challenge_id = ?2",
    )
    .bind(user_id.to_string())
    .bind(challenge_id.to_string())
    .fetch_optional(db)
    .await?;
    row.as_ref().map(taker_state_from_row).transpose()
}

#[derive(Debug, Deserialize)]
pub struct AvailableParams {
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: i64,
    pub title: Option<String>,
    /// Comma-separated topic names, e.g. `topics=frontend,api`.
    pub topics: Option<String>,
}

pub async fn available_challenges(
    State(state): State<AppState>,
    Query(params): Query<AvailableParams>,
) -> AppResult<Response> {
    let topics: Vec<String> = params
        .topics
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
        .collect();

    let mut sql = format!("{} WHERE c.approval = 'approved'", CHALLENGE_SELECT);
    if params.title.is_some() {
        sql.push_str(" AND LOWER(c.title) LIKE ?");
    }
    if !topics.is_empty() {
        let placeholders = vec!["?"; topics.len()].join(", ");
        sql.push_str(&format!(
            " AND c.id IN (SELECT ct.challenge_id FROM challenge_topics ct
                           JOIN topics t ON t.id = ct.topic_id WHERE t.name IN ({}))",
            placeholders
        ));
    }
    sql.push_str(" ORDER BY c.created_at DESC");
    if params.limit.is_some() {
        sql.push_str(" LIMIT ? OFFSET ?");
    }

    let mut query = sqlx::query(&sql);
    if let Some(title) = &params.title {
        query = query.bind(format!("%{}%", title.to_lowercase()));
    }
    for topic in &topics {
        query = query.bind(topic);
    }
    if let Some(limit) = params.limit {
        if limit < 0 {
            return Err(AppError::InvalidInput("limit must not be negative".to_string()));
        }
        query = query.bind(limit).bind(params.offset.max(0));
    }

    let rows = query.fetch_all(&state.db).await?;
    let mut challenges = Vec::with_capacity(rows.len());
    for row in &rows {
        challenges.push(challenge_info_from_row(&state.db, row).await?);
    }

    match params.limit {
        Some(limit) => {
            let has_next = challenges.len() as i64 == limit;
            Ok(Json(PaginatedChallengeInfo {
                has_prev: params.offset > 0,
                has_next,
                data: challenges,
            })
            .into_response())
        }
        None => Ok(Json(challenges).into_response()),
    }
}

pub async fn view_challenge(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    MaybeAuthUser(user): MaybeAuthUser,
) -> AppResult<Json<ViewChallengeOutput>> {
    let sql = format!("{} WHERE c.slug = ?1", CHALLENGE_SELECT);
    let row = sqlx::query(&sql)
        .bind(&slug)
        .fetch_optional(&state.db)
        .await?
        .ok_or_not_found("Challenge")?;

    let challenge = challenge_output_from_row(&state.db, &row).await?;
    let approval = approval_from_row(&row)?;

    let is_contributor = user.as_ref().is_some_and(|u| u.id == challenge.info.contributor.id);
    if approval != ApprovalStatus::Approved && !is_contributor {
        return Err(AppError::Forbidden(
            "You don't have access to see this challenge".to_string(),
        ));
    }

    let accepted_challenge = match &user {
        Some(u) => taker_state(&state.db, u.id, challenge.info.id).await?,
        None => None,
    };

    Ok(Json(ViewChallengeOutput { challenge, accepted_challenge }))
}

pub async fn create_new_challenge(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<NewChallengeInput>,
) -> AppResult<Response> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::ValidationError {
            field: "title".to_string(),
            message: "Title cannot be empty".to_string(),
        });
    }
    if req.description.trim().is_empty() {
        return Err(AppError::ValidationError {
            field: "description".to_string(),
            message: "Description cannot be empty".to_string(),
        });
    }

    // All referenced topics must exist before anything is written
    for topic in &req.topic_tags {
        let known = sqlx::query("SELECT id FROM topics WHERE id = ?1")
            .bind(topic.id.to_string())
            .fetch_optional(&state.db)
            .await?
            .is_some();
        if !known {
            return Err(AppError::BadRequest(format!("Unknown topic: {}", topic.name)));
        }
    }

    let id = Uuid::new_v4();
    let slug = format!("{}-{}", slugify(title), id);

    sqlx::query(
        r#"INSERT INTO challenges (id, title, slug, description, difficulty_tag, contributor_id, approval)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending')"#,
    )
    .bind(id.to_string())
    .bind(title)
    .bind(&slug)
    .bind(req.description.trim())
    .bind(req.difficulty_tag.as_str())
    .bind(user.id.to_string())
    .execute(&state.db)
    .await?;

    for topic in &req.topic_tags {
        sqlx::query(
            "INSERT INTO challenge_topics (challenge_id, topic_id) VALUES (?1, ?2)
             ON CONFLICT(challenge_id, topic_id) DO NOTHING",
        )
        .bind(id.to_string())
        .bind(topic.id.to_string())
        .execute(&state.db)
        .await?;
    }

    let sql = format!("{} WHERE c.id = ?1", CHALLENGE_SELECT);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_one(&state.db)
        .await?;
    let challenge = challenge_output_from_row(&state.db, &row).await?;

    Ok((StatusCode::CREATED, Json(challenge)).into_response())
}

pub async fn take_challenge(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<TakeChallengeRequest>,
) -> AppResult<Json<TakenChallengeState>> {
    let row = sqlx::query("SELECT approval FROM challenges WHERE id = ?1")
        .bind(req.challenge_id.to_string())
        .fetch_optional(&state.db)
        .await?
        .ok_or_not_found("Challenge")?;

    if approval_from_row(&row)? != ApprovalStatus::Approved {
        return Err(AppError::Forbidden("Challenge not approved".to_string()));
    }

    if taker_state(&state.db, user.id, req.challenge_id).await?.is_some() {
        return Err(AppError::Conflict("Challenge already taken".to_string()));
    }

    sqlx::query(
        "INSERT INTO challenge_takers (user_id, challenge_id, status) VALUES (?1, ?2, 'pending')",
    )
    .bind(user.id.to_string())
    .bind(req.challenge_id.to_string())
    .execute(&state.db)
    .await?;

    let taken = taker_state(&state.db, user.id, req.challenge_id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("taker row vanished after insert")))?;
    Ok(Json(taken))
}

pub async fn submit_challenge_solution(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ChallengeSolutionInput>,
) -> AppResult<Json<TakenChallengeState>> {
    let taken = taker_state(&state.db, user.id, req.challenge_id)
        .await?
        .ok_or_not_found("Challenge")?;

    match taken.status {
        ChallengeStatus::Submitted => {
            return Err(AppError::Forbidden(
                "Your solution for the challenge is under review. You can't submit again during review."
                    .to_string(),
            ))
        }
        ChallengeStatus::Accepted => {
            return Err(AppError::Forbidden(
                "Your solution for the challenge has been accepted.".to_string(),
            ))
        }
        ChallengeStatus::Pending | ChallengeStatus::Rejected => {}
    }

    sqlx::query(
        r#"UPDATE challenge_takers
           SET github_url = ?1, presentation_video_url = ?2, deployed_application_url = ?3,
               status = 'submitted', updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now')
           WHERE user_id = ?4 AND challenge_id = ?5"#,
    )
    .bind(&req.github_url)
    .bind(&req.presentation_video_url)
    .bind(&req.deployed_application_url)
    .bind(user.id.to_string())
    .bind(req.challenge_id.to_string())
    .execute(&state.db)
    .await?;

    let updated = taker_state(&state.db, user.id, req.challenge_id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("taker row vanished after update")))?;
    Ok(Json(updated))
}

/// Taken-state lookup used by the challenge page; anonymous callers get `null`.
pub async fn taken_challenge_info(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Json(req): Json<TakeChallengeRequest>,
) -> AppResult<Json<Option<TakenChallengeState>>> {
    match user {
        Some(u) => Ok(Json(taker_state(&state.db, u.id, req.challenge_id).await?)),
        None => Ok(Json(None)),
    }
}

#[derive(Debug, Deserialize)]
pub struct TakenAllParams {
    pub challenge_status: Option<String>,
}

pub async fn challenges_taken_by_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<TakenAllParams>,
) -> AppResult<Json<Vec<ChallengeTaken>>> {
    let user = get_user_by_username(&state.db, &username).await?.ok_or_not_found("User")?;

    let status_filter = params
        .challenge_status
        .as_deref()
        .map(|s| {
            ChallengeStatus::parse(s)
                .ok_or_else(|| AppError::InvalidInput(format!("invalid challenge status '{}'", s)))
        })
        .transpose()?;

    let mut sql = String::from(
        r#"SELECT c.id, c.title, c.slug, c.difficulty_tag,
                  ct.status, ct.github_url, ct.presentation_video_url, ct.deployed_application_url
             FROM challenges c
             JOIN challenge_takers ct ON ct.challenge_id = c.id
            WHERE ct.user_id = ?"#,
    );
    if status_filter.is_some() {
        sql.push_str(" AND ct.status = ?");
    }
    sql.push_str(" ORDER BY ct.created_at DESC");

    let mut query = sqlx::query(&sql).bind(user.id.to_string());
    if let Some(status) = status_filter {
        query = query.bind(status.as_str());
    }

    let rows = query.fetch_all(&state.db).await?;
    let mut taken = Vec::with_capacity(rows.len());
    for row in &rows {
        let id: String = row.try_get("id")?;
        let difficulty: String = row.try_get("difficulty_tag")?;
        let status: String = row.try_get("status")?;
        taken.push(ChallengeTaken {
            id: parse_uuid_column(&id, "challenge id")?,
            title: row.try_get("title")?,
            slug: row.try_get("slug")?,
            difficulty_tag: DifficultyTag::parse(&difficulty)
                .ok_or_else(|| AppError::Database(format!("unknown difficulty '{}'", difficulty)))?,
            topic_tags: topics_for_challenge(&state.db, &id).await?,
            status: ChallengeStatus::parse(&status)
                .ok_or_else(|| AppError::Database(format!("unknown challenge status '{}'", status)))?,
            github_url: row.try_get("github_url")?,
            presentation_video_url: row.try_get("presentation_video_url")?,
            deployed_application_url: row.try_get("deployed_application_url")?,
        });
    }
    Ok(Json(taken))
}

#[derive(Debug, Deserialize)]
pub struct ContributionsParams {
    pub approval_status: Option<String>,
}

pub async fn your_contributions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ContributionsParams>,
) -> AppResult<Json<Vec<ContributedChallengeInfo>>> {
    let approval_filter = params
        .approval_status
        .as_deref()
        .map(|s| {
            ApprovalStatus::parse(s)
                .ok_or_else(|| AppError::InvalidInput(format!("invalid approval status '{}'", s)))
        })
        .transpose()?;

    let mut sql = format!("{} WHERE c.contributor_id = ?", CHALLENGE_SELECT);
    if approval_filter.is_some() {
        sql.push_str(" AND c.approval = ?");
    }
    sql.push_str(" ORDER BY c.created_at DESC");

    let mut query = sqlx::query(&sql).bind(user.id.to_string());
    if let Some(approval) = approval_filter {
        query = query.bind(approval.as_str());
    }

    let rows = query.fetch_all(&state.db).await?;
    let mut contributions = Vec::with_capacity(rows.len());
    for row in &rows {
        contributions.push(ContributedChallengeInfo {
            info: challenge_info_from_row(&state.db, row).await?,
            approval: approval_from_row(row)?,
        });
    }
    Ok(Json(contributions))
}

pub async fn get_topics(State(state): State<AppState>) -> AppResult<Json<Vec<TopicDto>>> {
    let rows = sqlx::query("SELECT id, name FROM topics ORDER BY name")
        .fetch_all(&state.db)
        .await?;
    let topics = rows
        .iter()
        .map(|row| {
            let id: String = row.try_get("id")?;
            Ok(TopicDto {
                id: parse_uuid_column(&id, "topic id")?,
                name: row.try_get("name")?,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(topics))
}
