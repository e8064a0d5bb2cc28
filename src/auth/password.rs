use bcrypt::{hash, verify, DEFAULT_COST};

use crate::utils::error::AppError;

/// Hash a password with a fresh salt. Runs on the blocking thread pool
/// since bcrypt is CPU-bound.
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_string();

    tokio::task::spawn_blocking(move || hash(password, DEFAULT_COST))
        .await
        .map_err(|e| AppError::InternalServerError(format!("Hashing task failed: {}", e)))?
        .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
}

/// Verify a candidate password against a stored bcrypt hash.
pub async fn verify_password(password: &str, hashed: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let hashed = hashed.to_string();

    tokio::task::spawn_blocking(move || verify(password, &hashed))
        .await
        .map_err(|e| AppError::InternalServerError(format!("Hashing task failed: {}", e)))?
        .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashing_salts_every_call() {
        let first = hash_password("correct horse").await.unwrap();
        let second = hash_password("correct horse").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn verify_accepts_matching_password() {
        let hashed = hash_password("correct horse").await.unwrap();
        assert!(verify_password("correct horse", &hashed).await.unwrap());
    }

    #[tokio::test]
    async fn verify_rejects_wrong_password() {
        let hashed = hash_password("correct horse").await.unwrap();
        assert!(!verify_password("battery staple", &hashed).await.unwrap());
    }
}
