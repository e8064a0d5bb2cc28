use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::auth::guard::{ActiveUser, AdminUser};
use crate::models::Event;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Deserialize)]
pub struct EventFilter {
    pub category_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub organizer_id: Option<Uuid>,
    pub search: Option<String>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct EventCreate {
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub capacity: Option<i32>,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default = "default_published")]
    pub is_published: bool,
    pub category_id: Uuid,
}

fn default_published() -> bool {
    true
}

/// Update payload with exactly one canonical representation per field.
/// Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct EventUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub capacity: Option<i32>,
    pub price: Option<Decimal>,
    pub is_published: Option<bool>,
    pub category_id: Option<Uuid>,
}

impl EventUpdate {
    /// Merge into an existing event, re-checking the schedule window
    /// invariant against the merged result. Ownership and timestamps are
    /// never touched by an update payload.
    pub fn apply_to(self, event: &Event) -> Result<Event, AppError> {
        let merged = Event {
            id: event.id,
            title: self.title.unwrap_or_else(|| event.title.clone()),
            description: self.description.or_else(|| event.description.clone()),
            location: self.location.unwrap_or_else(|| event.location.clone()),
            start_date: self.start_date.unwrap_or(event.start_date),
            end_date: self.end_date.unwrap_or(event.end_date),
            capacity: self.capacity.or(event.capacity),
            price: self.price.unwrap_or(event.price),
            is_published: self.is_published.unwrap_or(event.is_published),
            organizer_id: event.organizer_id,
            category_id: self.category_id.unwrap_or(event.category_id),
            created_at: event.created_at,
            updated_at: event.updated_at,
        };

        if merged.start_date >= merged.end_date {
            return Err(AppError::ValidationError(
                "End date must be after start date".to_string(),
            ));
        }

        Ok(merged)
    }
}

async fn fetch_event(pool: &PgPool, event_id: Uuid) -> Result<Event, AppError> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
}

async fn ensure_category_exists(pool: &PgPool, category_id: Uuid) -> Result<(), AppError> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM categories WHERE id = $1")
        .bind(category_id)
        .fetch_optional(pool)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Result<Response, AppError> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM events WHERE 1 = 1");

    if let Some(category_id) = filter.category_id {
        query.push(" AND category_id = ").push_bind(category_id);
    }
    if let Some(start_date) = filter.start_date {
        query.push(" AND start_date >= ").push_bind(start_date);
    }
    if let Some(end_date) = filter.end_date {
        query.push(" AND end_date <= ").push_bind(end_date);
    }
    if let Some(price_min) = filter.price_min {
        query.push(" AND price >= ").push_bind(price_min);
    }
    if let Some(price_max) = filter.price_max {
        query.push(" AND price <= ").push_bind(price_max);
    }
    if let Some(organizer_id) = filter.organizer_id {
        query.push(" AND organizer_id = ").push_bind(organizer_id);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search);
        query
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR location ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    query
        .push(" ORDER BY start_date OFFSET ")
        .push_bind(filter.skip)
        .push(" LIMIT ")
        .push_bind(filter.limit);

    let events = query
        .build_query_as::<Event>()
        .fetch_all(&state.pool)
        .await?;

    Ok(success(events, "Events retrieved").into_response())
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = fetch_event(&state.pool, event_id).await?;
    Ok(success(event, "Event retrieved").into_response())
}

pub async fn create_event(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<EventCreate>,
) -> Result<Response, AppError> {
    ensure_category_exists(&state.pool, payload.category_id).await?;

    if payload.start_date >= payload.end_date {
        return Err(AppError::ValidationError(
            "End date must be after start date".to_string(),
        ));
    }

    let event = sqlx::query_as::<_, Event>(
        "INSERT INTO events (title, description, location, start_date, end_date, capacity, \
         price, is_published, organizer_id, category_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(&payload.location)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.capacity)
    .bind(payload.price)
    .bind(payload.is_published)
    .bind(admin.id)
    .bind(payload.category_id)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(event_id = %event.id, organizer_id = %admin.id, "created event");
    Ok(created(event, "Event created successfully").into_response())
}

pub async fn update_event(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<EventUpdate>,
) -> Result<Response, AppError> {
    let event = fetch_event(&state.pool, event_id).await?;

    if event.organizer_id != user.id && !user.role.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to update this event".to_string(),
        ));
    }

    if let Some(category_id) = payload.category_id {
        ensure_category_exists(&state.pool, category_id).await?;
    }

    let merged = payload.apply_to(&event)?;

    let updated = sqlx::query_as::<_, Event>(
        "UPDATE events SET title = $2, description = $3, location = $4, start_date = $5, \
         end_date = $6, capacity = $7, price = $8, is_published = $9, category_id = $10, \
         updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(merged.id)
    .bind(&merged.title)
    .bind(&merged.description)
    .bind(&merged.location)
    .bind(merged.start_date)
    .bind(merged.end_date)
    .bind(merged.capacity)
    .bind(merged.price)
    .bind(merged.is_published)
    .bind(merged.category_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(success(updated, "Event updated successfully").into_response())
}

pub async fn delete_event(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = fetch_event(&state.pool, event_id).await?;

    if event.organizer_id != user.id && !user.role.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to delete this event".to_string(),
        ));
    }

    sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event.id)
        .execute(&state.pool)
        .await?;

    tracing::info!(event_id = %event.id, "deleted event");
    Ok(empty_success("Event deleted successfully").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_event() -> Event {
        Event {
            id: Uuid::new_v4(),
            title: "RustConf".to_string(),
            description: Some("Annual conference".to_string()),
            location: "Berlin".to_string(),
            start_date: "2026-09-01T09:00:00Z".parse().unwrap(),
            end_date: "2026-09-02T18:00:00Z".parse().unwrap(),
            capacity: Some(500),
            price: Decimal::new(9900, 2),
            is_published: true,
            organizer_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn partial_update_preserves_unset_fields() {
        let event = stored_event();
        let update = EventUpdate {
            title: Some("RustConf EU".to_string()),
            ..EventUpdate::default()
        };

        let merged = update.apply_to(&event).unwrap();

        assert_eq!(merged.title, "RustConf EU");
        assert_eq!(merged.location, event.location);
        assert_eq!(merged.price, event.price);
        assert_eq!(merged.category_id, event.category_id);
    }

    #[test]
    fn update_cannot_reassign_organizer() {
        let event = stored_event();
        let merged = EventUpdate::default().apply_to(&event).unwrap();
        assert_eq!(merged.organizer_id, event.organizer_id);
    }

    #[test]
    fn merged_window_must_remain_valid() {
        let event = stored_event();
        let update = EventUpdate {
            end_date: Some("2026-08-31T18:00:00Z".parse().unwrap()),
            ..EventUpdate::default()
        };

        let err = update.apply_to(&event).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn moving_both_bounds_is_validated_together() {
        let event = stored_event();
        let update = EventUpdate {
            start_date: Some("2026-10-01T09:00:00Z".parse().unwrap()),
            end_date: Some("2026-10-03T18:00:00Z".parse().unwrap()),
            ..EventUpdate::default()
        };

        let merged = update.apply_to(&event).unwrap();
        assert!(merged.start_date < merged.end_date);
    }
}
