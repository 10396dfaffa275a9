// ABOUTME: JWT session token issuance and validation with bcrypt password hashing
// ABOUTME: Provides the AuthManager used by route handlers to identify users

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::database::UserRecord;
use crate::errors::{AppError, AppResult};

/// Session token lifetime
const TOKEN_EXPIRY_HOURS: i64 = 24;

/// JWT claims for a user session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// User email
    pub email: String,
    /// Issued-at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// Issues and validates HS256 session tokens
#[derive(Clone)]
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthManager {
    /// Create an auth manager from the configured JWT secret
    #[must_use]
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
        }
    }

    /// Hash a password for storage
    ///
    /// # Errors
    ///
    /// Returns an internal error if hashing fails.
    pub fn hash_password(password: &str) -> AppResult<String> {
        bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::internal(format!("Failed to hash password: {e}")))
    }

    /// Check a password against a stored hash
    ///
    /// # Errors
    ///
    /// Returns an auth error when the password does not match, or an
    /// internal error if verification itself fails.
    pub fn verify_password(password: &str, password_hash: &str) -> AppResult<()> {
        let valid = bcrypt::verify(password, password_hash)
            .map_err(|e| AppError::internal(format!("Failed to verify password: {e}")))?;
        if valid {
            Ok(())
        } else {
            Err(AppError::auth_invalid("Invalid email or password"))
        }
    }

    /// Issue a session token for a user
    ///
    /// # Errors
    ///
    /// Returns an internal error if signing fails.
    pub fn generate_token(&self, user: &UserRecord) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::hours(TOKEN_EXPIRY_HOURS)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }

    /// Validate a session token and return its claims
    ///
    /// # Errors
    ///
    /// Returns an auth error for expired, malformed, or mis-signed tokens.
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AppError::auth_invalid(format!("Invalid session token: {e}")))
    }
}

/// Extract the token from an `Authorization: Bearer` header value
///
/// # Errors
///
/// Returns an auth-required error when the header is missing or not a
/// bearer scheme.
pub fn extract_bearer_token(header: Option<&str>) -> AppResult<&str> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or_else(AppError::auth_required)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> UserRecord {
        UserRecord {
            id: "user-1".to_owned(),
            email: "test@example.com".to_owned(),
            password_hash: String::new(),
            display_name: None,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let auth = AuthManager::new("test-secret");
        let token = auth.generate_token(&test_user()).unwrap();
        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "test@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let auth = AuthManager::new("secret-a");
        let token = auth.generate_token(&test_user()).unwrap();
        assert!(AuthManager::new("secret-b").validate_token(&token).is_err());
    }

    #[test]
    fn test_bearer_extraction() {
        assert_eq!(extract_bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert!(extract_bearer_token(Some("Basic abc")).is_err());
        assert!(extract_bearer_token(Some("Bearer ")).is_err());
        assert!(extract_bearer_token(None).is_err());
    }

    #[test]
    fn test_password_hash_verify() {
        let hash = AuthManager::hash_password("hunter2").unwrap();
        assert!(AuthManager::verify_password("hunter2", &hash).is_ok());
        assert!(AuthManager::verify_password("wrong", &hash).is_err());
    }
}
