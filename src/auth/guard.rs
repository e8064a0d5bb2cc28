use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::models::{Role, User};
use crate::state::AppState;
use crate::utils::error::AppError;

/// Roles allowed through the admin gate. Every admin-only call site shares
/// this one policy.
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

pub fn require_role(user: &User, allowed: &[Role]) -> Result<(), AppError> {
    if user.role.permits(allowed) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not enough permissions".to_string()))
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::AuthError("No authorization token provided".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AppError::AuthError("Invalid authorization header. Expected 'Bearer <token>'".to_string())
        })
}

/// First guard stage: a verified token whose principal still exists.
pub struct CurrentUser(pub User);

/// Second guard stage: the principal's account has been activated.
pub struct ActiveUser(pub User);

/// Third guard stage: the principal holds an administrative role.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.tokens.verify(token)?;

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(claims.user_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_id = %claims.user_id, "token subject no longer exists");
                AppError::AuthError("Could not validate credentials".to_string())
            })?;

        tracing::debug!(user_id = %user.id, "authenticated request");
        Ok(Self(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ActiveUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if !user.is_active {
            return Err(AppError::Forbidden(
                "Account not activated. Please contact an administrator.".to_string(),
            ));
        }

        Ok(Self(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ActiveUser(user) = ActiveUser::from_request_parts(parts, state).await?;
        require_role(&user, ADMIN_ONLY)?;
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chrono::Utc;
    use uuid::Uuid;

    fn user_with_role(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            email: "guard@example.com".to_string(),
            name: "Guard".to_string(),
            password_hash: String::new(),
            role,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = value {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn admin_passes_role_gate() {
        assert!(require_role(&user_with_role(Role::Admin), ADMIN_ONLY).is_ok());
    }

    #[test]
    fn plain_user_is_forbidden_from_admin_gate() {
        let err = require_role(&user_with_role(Role::User), ADMIN_ONLY).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn bearer_token_extracts_credential() {
        let parts = parts_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn missing_header_is_unauthenticated() {
        let parts = parts_with_auth(None);
        assert!(matches!(
            bearer_token(&parts).unwrap_err(),
            AppError::AuthError(_)
        ));
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let parts = parts_with_auth(Some("Basic dXNlcjpwYXNz"));
        assert!(bearer_token(&parts).is_err());
    }

    #[test]
    fn empty_bearer_token_is_rejected() {
        let parts = parts_with_auth(Some("Bearer "));
        assert!(bearer_token(&parts).is_err());
    }
}
