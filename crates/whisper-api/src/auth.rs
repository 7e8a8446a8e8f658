use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use whisper_db::models::UserRow;
use whisper_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::{AppState, blocking, convert};

const MIN_PASSWORD_LEN: usize = 8;

/// Tokens expire this many days after issuance.
const TOKEN_TTL_DAYS: i64 = 7;

pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() || req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(
            "email and password (min 8 chars) are required",
        ));
    }

    let password_hash = hash_password(&req.password).map_err(ApiError::internal)?;

    let db = state.db.clone();
    let user = blocking(move || db.create_user(&req.email, &password_hash)).await?;
    info!(user_id = %user.id, "User registered");

    let response = auth_response(&state.jwt_secret, user)?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("email and password are required"));
    }

    let db = state.db.clone();
    let email = req.email.clone();
    let user = blocking(move || db.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| ApiError::internal(anyhow::anyhow!("stored hash unreadable: {}", e)))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    Ok(Json(auth_response(&state.jwt_secret, user)?))
}

/// Tokens are stateless; the client just forgets its token.
pub async fn logout() -> impl IntoResponse {
    Json(json!({ "success": true }))
}

fn auth_response(secret: &str, user: UserRow) -> Result<AuthResponse, ApiError> {
    let profile = convert::user_profile(user)?;
    let token = create_token(secret, profile.id, &profile.email).map_err(ApiError::internal)?;
    Ok(AuthResponse {
        token,
        user: profile,
    })
}

/// Argon2id PHC string for `password`.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

pub fn create_token(secret: &str, user_id: Uuid, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn verify_token(secret: &str, token: &str) -> anyhow::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_subject_and_email() {
        let id = Uuid::new_v4();
        let token = create_token("secret", id, "mary@example.com").unwrap();
        let claims = verify_token("secret", &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.email, "mary@example.com");

        let seven_days = chrono::Duration::days(TOKEN_TTL_DAYS).num_seconds() as usize;
        let now = chrono::Utc::now().timestamp() as usize;
        assert!(claims.exp > now + seven_days - 60);
        assert!(claims.exp <= now + seven_days + 1);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_token("secret", Uuid::new_v4(), "a@b.c").unwrap();
        assert!(verify_token("other", &token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "a@b.c".into(),
            exp: (chrono::Utc::now() - chrono::Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(verify_token("secret", &token).is_err());
    }
}
