use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::models::{Role, User};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user_id: Uuid,
    pub role: Role,
    pub is_active: bool,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&state.pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = hash_password(&payload.password).await?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, name, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(&payload.email)
    .bind(&payload.name)
    .bind(&password_hash)
    .bind(payload.role)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(user_id = %user.id, "registered new user");
    Ok(created(user, "User registered successfully").into_response())
}

/// Exchange (email, password) for a signed credential token. Unknown email
/// and wrong password are indistinguishable in the response.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&state.pool)
        .await?;

    let Some(user) = user else {
        tracing::debug!(email = %payload.email, "login attempt for unknown email");
        return Err(AppError::AuthError("Incorrect email or password".to_string()));
    };

    if !verify_password(&payload.password, &user.password_hash).await? {
        tracing::debug!(user_id = %user.id, "login attempt with wrong password");
        return Err(AppError::AuthError("Incorrect email or password".to_string()));
    }

    let access_token = state.tokens.issue(&user)?;
    let body = TokenResponse {
        access_token,
        token_type: "bearer",
        user_id: user.id,
        role: user.role,
        is_active: user.is_active,
    };

    Ok(success(body, "Login successful").into_response())
}
