use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;
use uuid::Uuid;

use crate::auth::guard::CurrentUser;
use crate::models::{CustomerInfo, Order, OrderItem};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub event_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct OrderCreateRequest {
    pub items: Vec<OrderItemRequest>,
    pub customer: CustomerInfo,
    /// Stored verbatim; totals are not recomputed server-side.
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Atomically persist an order and all of its lines. Every referenced event
/// is checked inside the same transaction; any missing event aborts the
/// whole operation, so readers never observe a partial order.
pub async fn create_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<OrderCreateRequest>,
) -> Result<Response, AppError> {
    if payload.items.is_empty() {
        return Err(AppError::ValidationError(
            "Order must contain at least one item".to_string(),
        ));
    }
    if payload.items.iter().any(|item| item.quantity < 1) {
        return Err(AppError::ValidationError(
            "Item quantity must be at least 1".to_string(),
        ));
    }

    tracing::debug!(user_id = %user.id, items = payload.items.len(), "creating order");

    let mut tx = state.pool.begin().await?;

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (user_id, total, customer_info, status) \
         VALUES ($1, $2, $3, 'completed') RETURNING *",
    )
    .bind(user.id)
    .bind(payload.total)
    .bind(SqlJson(&payload.customer))
    .fetch_one(&mut *tx)
    .await?;

    let mut items = Vec::with_capacity(payload.items.len());
    for item in &payload.items {
        // Returning early drops the transaction, rolling back the order row
        // and every line inserted so far.
        let event = sqlx::query_scalar::<_, Uuid>("SELECT id FROM events WHERE id = $1")
            .bind(item.event_id)
            .fetch_optional(&mut *tx)
            .await?;

        if event.is_none() {
            tracing::warn!(event_id = %item.event_id, "order references missing event");
            return Err(AppError::NotFound(format!(
                "Event with ID {} not found",
                item.event_id
            )));
        }

        let row = sqlx::query_as::<_, OrderItem>(
            "INSERT INTO order_items (order_id, event_id, quantity, price) \
             VALUES ($1, $2, $3, $4) RETURNING id, order_id, event_id, quantity, price",
        )
        .bind(order.id)
        .bind(item.event_id)
        .bind(item.quantity)
        .bind(item.price)
        .fetch_one(&mut *tx)
        .await?;

        items.push(row);
    }

    tx.commit().await?;

    tracing::info!(order_id = %order.id, user_id = %user.id, "order committed");
    Ok(created(OrderWithItems { order, items }, "Order created successfully").into_response())
}

pub async fn list_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at, id",
    )
    .bind(user.id)
    .fetch_all(&state.pool)
    .await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, event_id, quantity, price FROM order_items \
         WHERE order_id = ANY($1) ORDER BY seq",
    )
    .bind(&order_ids)
    .fetch_all(&state.pool)
    .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }

    let body: Vec<OrderWithItems> = orders
        .into_iter()
        .map(|order| {
            let items = by_order.remove(&order.id).unwrap_or_default();
            OrderWithItems { order, items }
        })
        .collect();

    Ok(success(body, "Orders retrieved").into_response())
}

/// Ownership is part of the lookup key: an order belonging to someone else
/// is reported exactly like a missing one.
pub async fn get_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let order = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE id = $1 AND user_id = $2",
    )
    .bind(order_id)
    .bind(user.id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, event_id, quantity, price FROM order_items \
         WHERE order_id = $1 ORDER BY seq",
    )
    .bind(order.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(success(OrderWithItems { order, items }, "Order retrieved").into_response())
}
