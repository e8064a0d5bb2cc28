use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Role, User};
use crate::utils::error::AppError;

/// Identity data embedded in a credential token. Validity is entirely
/// determined by the signature and the `exp` instant; there is no
/// server-side revocation list, so logout is client-side only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject email
    pub sub: String,
    pub user_id: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HMAC-signed, time-bounded credential tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 60; // clock skew tolerance

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Sign a token for `user` expiring `ttl` from now.
    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::InternalServerError(format!("Failed to sign token: {}", e)))
    }

    /// Check signature, algorithm, payload shape and expiry. Tokens signed
    /// with a different key or algorithm are rejected outright.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    AppError::AuthError("Token has expired".to_string())
                }
                _ => {
                    tracing::debug!(error = %e, "token verification failed");
                    AppError::AuthError("Could not validate credentials".to_string())
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "attendee@example.com".to_string(),
            name: "Attendee".to_string(),
            password_hash: String::new(),
            role: Role::Admin,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service() -> TokenService {
        TokenService::new("test-secret", Duration::minutes(30))
    }

    #[test]
    fn round_trip_preserves_claims() {
        let user = test_user();
        let service = service();

        let token = service.issue(&user).unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.sub, user.email);
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let service = service();
        let token = service.issue(&test_user()).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        assert_eq!(parts.len(), 3);

        // Flip one character in the middle of the claims segment.
        let payload = &parts[1];
        let mid = payload.len() / 2;
        let original = payload.as_bytes()[mid];
        let replacement = if original == b'A' { b'B' } else { b'A' };
        let mut bytes = payload.clone().into_bytes();
        bytes[mid] = replacement;
        parts[1] = String::from_utf8(bytes).unwrap();

        let tampered = parts.join(".");
        assert_ne!(tampered, token);
        assert!(service.verify(&tampered).is_err());
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let service = service();
        let token = service.issue(&test_user()).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[2] = parts[2].chars().rev().collect();
        let tampered = parts.join(".");

        if tampered != token {
            assert!(service.verify(&tampered).is_err());
        }
    }

    #[test]
    fn expired_token_is_rejected() {
        // Issued two minutes in the past, beyond the 60s leeway.
        let service = TokenService::new("test-secret", Duration::seconds(-120));
        let token = service.issue(&test_user()).unwrap();

        let err = service.verify(&token).unwrap_err();
        assert!(matches!(err, AppError::AuthError(ref msg) if msg.contains("expired")));
    }

    #[test]
    fn token_signed_with_different_key_is_rejected() {
        let issuer = TokenService::new("other-secret", Duration::minutes(30));
        let verifier = service();

        let token = issuer.issue(&test_user()).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn token_signed_with_different_algorithm_is_rejected() {
        let user = test_user();
        let now = Utc::now();
        let claims = Claims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            iat: now.timestamp(),
            exp: (now + Duration::minutes(30)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(service().verify(&token).is_err());
    }
}
