use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{auth, categories, events, health_check, orders, tickets, users};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/users/me", get(users::me).put(users::update_me))
        .route("/users", get(users::list_users))
        .route(
            "/users/:user_id",
            put(users::update_user).delete(users::delete_user),
        )
        .route("/users/:user_id/activate", patch(users::activate_user))
        .route(
            "/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/events/:event_id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/:category_id",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/orders", post(orders::create_order).get(orders::list_orders))
        .route("/orders/:order_id", get(orders::get_order))
        .route("/tickets/my-tickets", get(tickets::my_tickets))
        .route("/tickets/:ticket_id", delete(tickets::cancel_ticket));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
