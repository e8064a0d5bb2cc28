use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::guard::{ActiveUser, AdminUser};
use crate::models::{Role, User};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};

use super::Pagination;

#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminUserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct ActivateQuery {
    pub activate: bool,
}

async fn ensure_email_free(pool: &PgPool, email: &str, user_id: Uuid) -> Result<(), AppError> {
    let taken = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    match taken {
        Some(id) if id != user_id => {
            Err(AppError::Conflict("Email already registered".to_string()))
        }
        _ => Ok(()),
    }
}

async fn fetch_user(pool: &PgPool, user_id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn me(ActiveUser(user): ActiveUser) -> Response {
    success(user, "Current user").into_response()
}

pub async fn update_me(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Response, AppError> {
    if let Some(email) = &payload.email {
        ensure_email_free(&state.pool, email, user.id).await?;
    }

    let updated = sqlx::query_as::<_, User>(
        "UPDATE users SET name = COALESCE($2, name), email = COALESCE($3, email), \
         updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(user.id)
    .bind(payload.name)
    .bind(payload.email)
    .fetch_one(&state.pool)
    .await?;

    Ok(success(updated, "Profile updated successfully").into_response())
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(page): Query<Pagination>,
) -> Result<Response, AppError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users ORDER BY created_at OFFSET $1 LIMIT $2",
    )
    .bind(page.skip)
    .bind(page.limit)
    .fetch_all(&state.pool)
    .await?;

    Ok(success(users, "Users retrieved").into_response())
}

pub async fn update_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<AdminUserUpdate>,
) -> Result<Response, AppError> {
    let target = fetch_user(&state.pool, user_id).await?;

    if let Some(email) = &payload.email {
        ensure_email_free(&state.pool, email, target.id).await?;
    }

    let updated = sqlx::query_as::<_, User>(
        "UPDATE users SET name = COALESCE($2, name), email = COALESCE($3, email), \
         role = COALESCE($4, role), updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(target.id)
    .bind(payload.name)
    .bind(payload.email)
    .bind(payload.role)
    .fetch_one(&state.pool)
    .await?;

    Ok(success(updated, "User updated successfully").into_response())
}

pub async fn activate_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<Uuid>,
    Query(params): Query<ActivateQuery>,
) -> Result<Response, AppError> {
    let updated = sqlx::query_as::<_, User>(
        "UPDATE users SET is_active = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(user_id)
    .bind(params.activate)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %updated.id, active = updated.is_active, "changed activation state");
    Ok(success(updated, "Activation state updated").into_response())
}

pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let target = fetch_user(&state.pool, user_id).await?;

    if target.id == admin.id {
        return Err(AppError::ValidationError(
            "You cannot delete your own account".to_string(),
        ));
    }

    let owned_orders = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(target.id)
        .fetch_one(&state.pool)
        .await?;

    if owned_orders > 0 {
        return Err(AppError::Conflict(
            "User owns orders and cannot be deleted".to_string(),
        ));
    }

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(target.id)
        .execute(&state.pool)
        .await?;

    tracing::info!(user_id = %target.id, "deleted user");
    Ok(empty_success("User deleted successfully").into_response())
}
