use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::types::UserRole;

pub const ACCESS_TOKEN: &str = "access";
pub const REFRESH_TOKEN: &str = "refresh";

/// Claims carried by both access and refresh tokens. `sub` is the user id,
/// `token_type` distinguishes the two so a refresh token can never pass as
/// an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub role: UserRole,
    pub token_type: String,
    pub exp: i64,
}

/// An issued token together with its expiry, as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub token: String,
    pub scheme: String,
    pub expires_at: DateTime<Utc>,
}

fn create_token(
    secret: &str,
    user_id: &str,
    role: UserRole,
    token_type: &str,
    lifetime_secs: i64,
) -> AppResult<IssuedToken> {
    let expires_at = Utc::now() + Duration::seconds(lifetime_secs);
    let claims = TokenClaims {
        sub: user_id.to_owned(),
        role,
        token_type: token_type.to_owned(),
        exp: expires_at.timestamp(),
    };
    let token = encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("token encoding failed: {}", e)))?;
    Ok(IssuedToken { token, scheme: "bearer".to_owned(), expires_at })
}

pub fn create_access_token(
    secret: &str,
    user_id: &str,
    role: UserRole,
    lifetime_secs: i64,
) -> AppResult<IssuedToken> {
    create_token(secret, user_id, role, ACCESS_TOKEN, lifetime_secs)
}

pub fn create_refresh_token(
    secret: &str,
    user_id: &str,
    role: UserRole,
    lifetime_secs: i64,
) -> AppResult<IssuedToken> {
    create_token(secret, user_id, role, REFRESH_TOKEN, lifetime_secs)
}

/// Decode and validate a token of the expected type. Expired or otherwise
/// invalid tokens, and tokens of the wrong type, are rejected with 401.
pub fn decode_token(secret: &str, token: &str, expected_type: &str) -> AppResult<TokenClaims> {
    let data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Unauthorized("Token has expired".to_owned())
        }
        _ => AppError::Unauthorized("Could not validate credentials".to_owned()),
    })?;

    if data.claims.token_type != expected_type {
        return Err(AppError::Unauthorized("Invalid token type".to_owned()));
    }
    Ok(data.claims)
}

/// Mint a fresh access token from a valid refresh token, preserving the
/// subject and role.
pub fn refresh_access_token(
    secret: &str,
    refresh_token: &str,
    lifetime_secs: i64,
) -> AppResult<IssuedToken> {
    let claims = decode_token(secret, refresh_token, REFRESH_TOKEN)?;
    create_access_token(secret, &claims.sub, claims.role, lifetime_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn access_token_round_trip() {
        let issued = create_access_token(SECRET, "user-1", UserRole::User, 900).unwrap();
        let claims = decode_token(SECRET, &issued.token, ACCESS_TOKEN).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, UserRole::User);
    }

    #[test]
    fn refresh_token_rejected_as_access_token() {
        let issued = create_refresh_token(SECRET, "user-1", UserRole::User, 900).unwrap();
        assert!(decode_token(SECRET, &issued.token, ACCESS_TOKEN).is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let issued = create_access_token(SECRET, "user-1", UserRole::User, -120).unwrap();
        assert!(decode_token(SECRET, &issued.token, ACCESS_TOKEN).is_err());
    }

    #[test]
    fn wrong_secret_rejected() {
        let issued = create_access_token(SECRET, "user-1", UserRole::Admin, 900).unwrap();
        assert!(decode_token("other-secret", &issued.token, ACCESS_TOKEN).is_err());
    }

    #[test]
    fn refresh_flow_preserves_subject_and_role() {
        let refresh = create_refresh_token(SECRET, "user-7", UserRole::Admin, 3600).unwrap();
        let access = refresh_access_token(SECRET, &refresh.token, 900).unwrap();
        let claims = decode_token(SECRET, &access.token, ACCESS_TOKEN).unwrap();
        assert_eq!(claims.sub, "user-7");
        assert_eq!(claims.role, UserRole::Admin);
    }
}
