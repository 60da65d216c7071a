use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::auth::{cookie_value, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
    routes::users::{get_user_by_id, get_user_by_username, get_user_by_username_or_email},
    security::{password, token},
    state::AppState,
    types::{AccountProvider, LoginRequest, RefreshTokenRequest, SignupRequest},
};

fn validate_password(password: &str) -> AppResult<()> {
    if password.is_empty() {
        return Err(AppError::BadRequest("No password provided".to_string()));
    }
    if !(8..=20).contains(&password.chars().count()) {
        return Err(AppError::ValidationError {
            field: "password".to_string(),
            message: "Password must be between 8 and 20 characters".to_string(),
        });
    }
    Ok(())
}

fn auth_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> AppResult<HeaderValue> {
    let mut cookie =
        format!("{}={}; HttpOnly; Path=/; SameSite=None; Max-Age={}", name, value, max_age_secs);
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid cookie value: {}", e)))
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> AppResult<Response> {
    let username = req.username.trim().to_lowercase();
    let email = req.email.trim().to_lowercase();

    if username.is_empty() {
        return Err(AppError::ValidationError {
            field: "username".to_string(),
            message: "Username cannot be empty".to_string(),
        });
    }
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::ValidationError {
            field: "email".to_string(),
            message: "A valid e-mail address is required".to_string(),
        });
    }
    validate_password(&req.password)?;

    if get_user_by_username(&state.db, &username).await?.is_some() {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }
    let email_taken = sqlx::query("SELECT id FROM users WHERE email = ?1")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?
        .is_some();
    if email_taken {
        return Err(AppError::Conflict("Email already exists".to_string()));
    }

    let hash = password::hash_password(&req.password)?;
    let id = Uuid::new_v4();

    sqlx::query(
        r#"INSERT INTO users
               (id, first_name, last_name, username, email, role, password,
                is_email_verified, is_active, provider)
           VALUES (?1, ?2, ?3, ?4, ?5, 'user', ?6, 1, 1, ?7)"#,
    )
    .bind(id.to_string())
    .bind(req.first_name.trim())
    .bind(req.last_name.as_deref().map(str::trim))
    .bind(&username)
    .bind(&email)
    .bind(&hash)
    .bind(AccountProvider::Credentials.as_str())
    .execute(&state.db)
    .await?;

    let user = get_user_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("user vanished after insert")))?;

    Ok((StatusCode::CREATED, Json(user)).into_response())
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Response> {
    let identifier = req.username.trim().to_lowercase();
    let raw_password = req.password.trim();
    validate_password(raw_password)?;

    let user = get_user_by_username_or_email(&state.db, &identifier)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "No user found with the provided credentials, {}",
                identifier
            ))
        })?;

    let stored_hash: Option<String> = sqlx::query("SELECT password FROM users WHERE id = ?1")
        .bind(user.id.to_string())
        .fetch_one(&state.db)
        .await?
        .try_get("password")?;

    let stored_hash = stored_hash.ok_or_else(|| {
        AppError::BadRequest(
            "User doesn't have a password. Please set a password to make credentials login work."
                .to_string(),
        )
    })?;

    if !password::verify_password(raw_password, &stored_hash)? {
        return Err(AppError::BadRequest("Incorrect password".to_string()));
    }

    let auth_cfg = &state.config.auth;
    let user_id = user.id.to_string();
    let access = token::create_access_token(
        &auth_cfg.secret_key,
        &user_id,
        user.role,
        auth_cfg.access_token_expire_secs,
    )?;
    let refresh = token::create_refresh_token(
        &auth_cfg.secret_key,
        &user_id,
        user.role,
        auth_cfg.refresh_token_expire_secs,
    )?;

    // Record the login, best effort
    if let Err(e) = sqlx::query("INSERT INTO login_histories (user_id) VALUES (?1)")
        .bind(&user_id)
        .execute(&state.db)
        .await
    {
        tracing::warn!("failed to record login history for {}: {}", user_id, e);
    }

    let mut response =
        Json(json!({ "user": &user, "access": &access, "refresh": &refresh })).into_response();
    response.headers_mut().append(
        header::SET_COOKIE,
        auth_cookie(
            ACCESS_TOKEN_COOKIE,
            &access.token,
            auth_cfg.access_token_expire_secs,
            auth_cfg.secure_cookies,
        )?,
    );
    response.headers_mut().append(
        header::SET_COOKIE,
        auth_cookie(
            REFRESH_TOKEN_COOKIE,
            &refresh.token,
            auth_cfg.refresh_token_expire_secs,
            auth_cfg.secure_cookies,
        )?,
    );
    Ok(response)
}

pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    // Token from the JSON body if one was sent, otherwise from the cookie
    let from_body = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<RefreshTokenRequest>(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?
            .refresh_token
    };
    let refresh = from_body
        .or_else(|| cookie_value(&headers, REFRESH_TOKEN_COOKIE))
        .ok_or_else(|| AppError::BadRequest("Provide refresh token".to_string()))?;

    let auth_cfg = &state.config.auth;
    let access = token::refresh_access_token(
        &auth_cfg.secret_key,
        &refresh,
        auth_cfg.access_token_expire_secs,
    )?;

    let mut response = Json(json!({ "access": &access })).into_response();
    response.headers_mut().append(
        header::SET_COOKIE,
        auth_cookie(
            ACCESS_TOKEN_COOKIE,
            &access.token,
            auth_cfg.access_token_expire_secs,
            auth_cfg.secure_cookies,
        )?,
    );
    Ok(response)
}

pub async fn logout(State(state): State<AppState>) -> AppResult<Response> {
    let secure = state.config.auth.secure_cookies;
    let mut response = Json(json!({ "message": "Logout successful" })).into_response();
    response
        .headers_mut()
        .append(header::SET_COOKIE, auth_cookie(ACCESS_TOKEN_COOKIE, "", 0, secure)?);
    response
        .headers_mut()
        .append(header::SET_COOKIE, auth_cookie(REFRESH_TOKEN_COOKIE, "", 0, secure)?);
    Ok(response)
}
