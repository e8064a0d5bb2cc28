use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::utils::response::success;

pub mod auth;
pub mod categories;
pub mod events;
pub mod orders;
pub mod tickets;
pub mod users;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "eventum-api",
    };

    success(payload, "Health check successful").into_response()
}

/// Common skip/limit paging parameters for listing endpoints.
#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}
