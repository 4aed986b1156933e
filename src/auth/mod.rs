//! Authentication for the API: argon2 password hashing, HS256 access tokens
//! and the bearer middleware that turns a token into an [`AuthUser`] — the
//! authenticated principal identifier every owner-scoped service call takes.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::errors::ServiceError;

/// Claim structure for JWT access tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated principal extracted from a verified token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub token_id: String,
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_issuer: String,
        jwt_audience: String,
        access_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            access_token_expiration,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Token expired")]
    TokenExpired,
    #[error("Token creation failed: {0}")]
    TokenCreation(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Password hashing failed: {0}")]
    Hash(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                ServiceError::AuthError("Invalid credentials".to_string())
            }
            AuthError::TokenExpired => ServiceError::Unauthorized("Token expired".to_string()),
            AuthError::InvalidToken(msg) => ServiceError::Unauthorized(msg),
            AuthError::TokenCreation(msg) => ServiceError::InternalError(msg),
            AuthError::Hash(msg) => ServiceError::HashError(msg),
        }
    }
}

/// Issues and verifies access tokens and hashes credentials. User records
/// themselves are managed by the user service.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hash(e.to_string()))
    }

    pub fn verify_password(&self, password: &str, password_hash: &str) -> Result<(), AuthError> {
        let parsed =
            PasswordHash::new(password_hash).map_err(|e| AuthError::Hash(e.to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AuthError::InvalidCredentials)
    }

    pub fn generate_token(&self, user_id: Uuid, email: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.jwt_issuer]);
        validation.set_audience(&[&self.config.jwt_audience]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken(e.to_string()),
        })
    }

    /// Resolve the principal from a verified token's claims.
    pub fn auth_user_from_claims(&self, claims: &Claims) -> Result<AuthUser, AuthError> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::InvalidToken("Malformed subject claim".to_string()))?;
        Ok(AuthUser {
            user_id,
            email: claims.email.clone(),
            token_id: claims.jti.clone(),
        })
    }
}

fn bearer_token(parts: &header::HeaderMap) -> Result<String, ServiceError> {
    let header_value = parts
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized("Missing Authorization header".to_string()))?;

    header_value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ServiceError::Unauthorized("Expected Bearer token".to_string()))
}

/// Middleware that authenticates the request and stores the [`AuthUser`] in
/// request extensions for handler extractors.
pub async fn require_auth(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = bearer_token(request.headers())?;
    let claims = auth.validate_token(&token).map_err(ServiceError::from)?;
    let user = auth.auth_user_from_claims(&claims).map_err(ServiceError::from)?;

    debug!(user_id = %user.user_id, "Authenticated request");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ServiceError::Unauthorized("Missing authentication".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "unit_test_secret_key_that_is_long_enough_for_signing_tokens_0123".to_string(),
            "stockledger-api".to_string(),
            "stockledger-clients".to_string(),
            Duration::from_secs(3600),
        ))
    }

    #[test]
    fn token_round_trip() {
        let svc = test_service();
        let user_id = Uuid::new_v4();
        let token = svc.generate_token(user_id, "a@b.test").unwrap();
        let claims = svc.validate_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "a@b.test");

        let user = svc.auth_user_from_claims(&claims).unwrap();
        assert_eq!(user.user_id, user_id);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let svc = test_service();
        let token = svc.generate_token(Uuid::new_v4(), "a@b.test").unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(svc.validate_token(&tampered).is_err());
    }

    #[test]
    fn password_hash_round_trip() {
        let svc = test_service();
        let hash = svc.hash_password("correct horse battery staple").unwrap();
        assert!(svc.verify_password("correct horse battery staple", &hash).is_ok());
        assert!(matches!(
            svc.verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
