use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::guard::CurrentUser;
use crate::models::{CustomerInfo, Order, OrderItem};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};

const TICKET_TYPE: &str = "Standard";
const TICKET_STATUS: &str = "active";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketEventInfo {
    pub id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    pub location: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketAttendeeInfo {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Derived read view over OrderItem → Event → Order. Never stored; the
/// order item id doubles as the ticket id.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub id: Uuid,
    pub event: TicketEventInfo,
    pub quantity: i32,
    pub ticket_type: &'static str,
    pub total_price: Decimal,
    pub status: &'static str,
    pub purchase_date: DateTime<Utc>,
    pub attendee: TicketAttendeeInfo,
}

/// One purchased line joined with its order and (possibly deleted) event.
#[derive(Debug, FromRow)]
struct TicketRow {
    item_id: Uuid,
    event_id: Uuid,
    quantity: i32,
    price: Decimal,
    purchased_at: DateTime<Utc>,
    customer_info: Json<CustomerInfo>,
    event_title: Option<String>,
    event_start: Option<DateTime<Utc>>,
    event_location: Option<String>,
}

/// Project a joined row into the ticket view, or `None` when the referenced
/// event no longer exists.
fn project(row: TicketRow) -> Option<TicketResponse> {
    let (title, date, location) = match (row.event_title, row.event_start, row.event_location) {
        (Some(title), Some(date), Some(location)) => (title, date, location),
        _ => return None,
    };

    let customer = row.customer_info.0;

    Some(TicketResponse {
        id: row.item_id,
        event: TicketEventInfo {
            id: row.event_id,
            title,
            date,
            location,
        },
        quantity: row.quantity,
        ticket_type: TICKET_TYPE,
        total_price: row.price * Decimal::from(row.quantity),
        status: TICKET_STATUS,
        purchase_date: row.purchased_at,
        attendee: TicketAttendeeInfo {
            name: customer.name,
            email: customer.email,
            phone: customer.phone,
        },
    })
}

/// List one ticket per purchased line across the caller's orders, in
/// order-then-line insertion order. Lines whose event has since been
/// removed are skipped rather than failing the whole listing.
pub async fn my_tickets(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    let rows = sqlx::query_as::<_, TicketRow>(
        "SELECT oi.id AS item_id, oi.event_id, oi.quantity, oi.price, \
                o.created_at AS purchased_at, o.customer_info, \
                e.title AS event_title, e.start_date AS event_start, \
                e.location AS event_location \
         FROM order_items oi \
         JOIN orders o ON o.id = oi.order_id \
         LEFT JOIN events e ON e.id = oi.event_id \
         WHERE o.user_id = $1 \
         ORDER BY o.created_at, o.id, oi.seq",
    )
    .bind(user.id)
    .fetch_all(&state.pool)
    .await?;

    let mut tickets = Vec::with_capacity(rows.len());
    for row in rows {
        let (item_id, event_id) = (row.item_id, row.event_id);
        match project(row) {
            Some(ticket) => tickets.push(ticket),
            None => {
                tracing::warn!(
                    item_id = %item_id,
                    event_id = %event_id,
                    "event no longer exists for order item, skipping"
                );
            }
        }
    }

    tracing::debug!(user_id = %user.id, count = tickets.len(), "listed tickets");
    Ok(success(tickets, "Tickets retrieved").into_response())
}

/// Cancellation deletes the purchased line outright; there is no retained
/// "cancelled" state.
pub async fn cancel_ticket(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(ticket_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let item = sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, event_id, quantity, price FROM order_items WHERE id = $1",
    )
    .bind(ticket_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(item.order_id)
        .fetch_optional(&state.pool)
        .await?;

    if order.map(|order| order.user_id) != Some(user.id) {
        tracing::warn!(user_id = %user.id, ticket_id = %ticket_id, "refused foreign ticket cancellation");
        return Err(AppError::Forbidden(
            "You do not have permission to cancel this ticket".to_string(),
        ));
    }

    sqlx::query("DELETE FROM order_items WHERE id = $1")
        .bind(item.id)
        .execute(&state.pool)
        .await?;

    tracing::info!(ticket_id = %ticket_id, user_id = %user.id, "ticket cancelled");
    Ok(empty_success("Ticket cancelled successfully").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(quantity: i32, price: Decimal, with_event: bool) -> TicketRow {
        TicketRow {
            item_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            quantity,
            price,
            purchased_at: Utc::now(),
            customer_info: Json(CustomerInfo {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                phone: Some("+4930123".to_string()),
                address: None,
                city: None,
                zip_code: None,
            }),
            event_title: with_event.then(|| "RustConf".to_string()),
            event_start: with_event.then(Utc::now),
            event_location: with_event.then(|| "Berlin".to_string()),
        }
    }

    #[test]
    fn total_price_is_unit_price_times_quantity() {
        let ticket = project(row(3, Decimal::new(100, 1), true)).unwrap();
        assert_eq!(ticket.total_price, Decimal::new(300, 1));
    }

    #[test]
    fn projection_copies_attendee_from_customer_info() {
        let ticket = project(row(1, Decimal::ONE, true)).unwrap();
        assert_eq!(ticket.attendee.name, "Ada");
        assert_eq!(ticket.attendee.email, "ada@example.com");
        assert_eq!(ticket.attendee.phone.as_deref(), Some("+4930123"));
    }

    #[test]
    fn projection_uses_fixed_type_and_status() {
        let ticket = project(row(1, Decimal::ONE, true)).unwrap();
        assert_eq!(ticket.ticket_type, "Standard");
        assert_eq!(ticket.status, "active");
    }

    #[test]
    fn dangling_event_reference_is_skipped() {
        assert!(project(row(2, Decimal::ONE, false)).is_none());
    }

    #[test]
    fn wire_format_uses_camel_case() {
        let ticket = project(row(2, Decimal::new(1050, 2), true)).unwrap();
        let json = serde_json::to_value(&ticket).unwrap();
        assert!(json.get("totalPrice").is_some());
        assert!(json.get("ticketType").is_some());
        assert!(json.get("purchaseDate").is_some());
    }
}
