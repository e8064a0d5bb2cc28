use sqlx::PgPool;

use crate::auth::TokenService;

/// Shared per-process resources, handed to every handler through axum's
/// state extraction. Each request borrows a pooled connection from `pool`;
/// nothing else is shared across requests.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub tokens: TokenService,
}
