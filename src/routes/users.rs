use axum::{
    extract::{Path, State},
    response::Response,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, OptionExt},
    middleware::auth::AuthUser,
    state::AppState,
    types::{ProfileDto, UpdateUserRequest, UserOutput, UserRole},
};

const USER_SELECT: &str = r#"SELECT u.id, u.first_name, u.last_name, u.username, u.email, u.role,
       u.is_email_verified, u.is_active, u.created_at,
       p.user_id AS profile_user_id, p.about, p.image_url
  FROM users u LEFT JOIN profiles p ON p.user_id = u.id"#;

pub(crate) fn user_from_row(row: &SqliteRow) -> AppResult<UserOutput> {
    let id: String = row.try_get("id")?;
    let role: String = row.try_get("role")?;
    let profile_user_id: Option<String> = row.try_get("profile_user_id")?;

    let profile = profile_user_id.map(|_| -> AppResult<ProfileDto> {
        Ok(ProfileDto { about: row.try_get("about")?, image_url: row.try_get("image_url")? })
    });

    Ok(UserOutput {
        id: Uuid::parse_str(&id)
            .map_err(|_| AppError::Database(format!("invalid user id '{}'", id)))?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        role: UserRole::parse(&role)
            .ok_or_else(|| AppError::Database(format!("unknown user role '{}'", role)))?,
        is_email_verified: row.try_get("is_email_verified")?,
        is_active: row.try_get("is_active")?,
        profile: profile.transpose()?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) async fn get_user_by_id(db: &SqlitePool, id: Uuid) -> AppResult<Option<UserOutput>> {
    let sql = format!("{} WHERE u.id = ?1", USER_SELECT);
    let row = sqlx::query(&sql).bind(id.to_string()).fetch_optional(db).await?;
    row.as_ref().map(user_from_row).transpose()
}

pub(crate) async fn get_user_by_username(
    db: &SqlitePool,
    username: &str,
) -> AppResult<Option<UserOutput>> {
    let sql = format!("{} WHERE u.username = ?1", USER_SELECT);
    let row = sqlx::query(&sql).bind(username).fetch_optional(db).await?;
    row.as_ref().map(user_from_row).transpose()
}

/// Lookup for login: the identifier may be the username or the e-mail.
pub(crate) async fn get_user_by_username_or_email(
    db: &SqlitePool,
    identifier: &str,
) -> AppResult<Option<UserOutput>> {
    let sql = format!("{} WHERE u.username = ?1 OR u.email = ?1", USER_SELECT);
    let row = sqlx::query(&sql).bind(identifier).fetch_optional(db).await?;
    row.as_ref().map(user_from_row).transpose()
}

pub async fn me(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<UserOutput>> {
    let found = get_user_by_id(&state.db, user.id).await?.ok_or_not_found("User")?;
    Ok(Json(found))
}

pub async fn user_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<UserOutput>> {
    let found = get_user_by_username(&state.db, &username).await?.ok_or_not_found("User")?;
    Ok(Json(found))
}

pub async fn check_username_availability(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let taken = get_user_by_username(&state.db, &username).await?.is_some();
    Ok(Json(json!({ "isAvailable": !taken })).into_response())
}

pub async fn update_user_info(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<UpdateUserRequest>,
) -> AppResult<Json<UserOutput>> {
    if let Some(username) = &req.username {
        if username.trim().is_empty() {
            return Err(AppError::ValidationError {
                field: "username".to_string(),
                message: "Username cannot be empty".to_string(),
            });
        }
    }

    let result = sqlx::query(
        r#"UPDATE users SET
               first_name = COALESCE(?1, first_name),
               last_name = COALESCE(?2, last_name),
               username = COALESCE(?3, username)
           WHERE id = ?4"#,
    )
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.username)
    .bind(user.id.to_string())
    .execute(&state.db)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict("Username already exists".to_string()),
        other => other,
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let updated = get_user_by_id(&state.db, user.id).await?.ok_or_not_found("User")?;
    Ok(Json(updated))
}
