use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::guard::AdminUser;
use crate::models::Category;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

use super::Pagination;

#[derive(Debug, Deserialize)]
pub struct CategoryCreate {
    pub name: String,
    pub color: String,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

async fn fetch_category(pool: &PgPool, category_id: Uuid) -> Result<Category, AppError> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(category_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
}

async fn ensure_name_free(pool: &PgPool, name: &str, category_id: Option<Uuid>) -> Result<(), AppError> {
    let taken = sqlx::query_scalar::<_, Uuid>("SELECT id FROM categories WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    match taken {
        Some(id) if Some(id) != category_id => Err(AppError::Conflict(
            "Category with this name already exists".to_string(),
        )),
        _ => Ok(()),
    }
}

pub async fn list_categories(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Response, AppError> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT * FROM categories ORDER BY name OFFSET $1 LIMIT $2",
    )
    .bind(page.skip)
    .bind(page.limit)
    .fetch_all(&state.pool)
    .await?;

    Ok(success(categories, "Categories retrieved").into_response())
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let category = fetch_category(&state.pool, category_id).await?;
    Ok(success(category, "Category retrieved").into_response())
}

pub async fn create_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<CategoryCreate>,
) -> Result<Response, AppError> {
    ensure_name_free(&state.pool, &payload.name, None).await?;

    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (name, color, icon) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&payload.name)
    .bind(&payload.color)
    .bind(&payload.icon)
    .fetch_one(&state.pool)
    .await?;

    Ok(created(category, "Category created successfully").into_response())
}

pub async fn update_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<CategoryUpdate>,
) -> Result<Response, AppError> {
    let category = fetch_category(&state.pool, category_id).await?;

    if let Some(name) = &payload.name {
        ensure_name_free(&state.pool, name, Some(category.id)).await?;
    }

    let updated = sqlx::query_as::<_, Category>(
        "UPDATE categories SET name = COALESCE($2, name), color = COALESCE($3, color), \
         icon = COALESCE($4, icon) WHERE id = $1 RETURNING *",
    )
    .bind(category.id)
    .bind(payload.name)
    .bind(payload.color)
    .bind(payload.icon)
    .fetch_one(&state.pool)
    .await?;

    Ok(success(updated, "Category updated successfully").into_response())
}

pub async fn delete_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(category_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let category = fetch_category(&state.pool, category_id).await?;

    let in_use = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events WHERE category_id = $1")
        .bind(category.id)
        .fetch_one(&state.pool)
        .await?;

    if in_use > 0 {
        return Err(AppError::Conflict(
            "Category is referenced by existing events".to_string(),
        ));
    }

    sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(category.id)
        .execute(&state.pool)
        .await?;

    Ok(empty_success("Category deleted successfully").into_response())
}
