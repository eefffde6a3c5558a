//! Token-based identity: JWT issue/verify, password hashing, and the
//! configuration-gated dev identity provider.
//!
//! The dev provider is a decorator around the real verifier rather than a
//! branch inside it, and the wiring helper refuses to attach it when the
//! deployment is marked production.

pub mod router;

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::UserId;
use crate::storage::{Storage, StorageError};

/// The verified caller of a request. The dev identity carries no user id but
/// is an administrator by construction.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: Option<UserId>,
    pub is_admin: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no token, authorization denied")]
    MissingToken,
    #[error("token is not valid")]
    InvalidToken,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("administrator access required")]
    Forbidden,
    #[error("failed to sign token")]
    TokenEncoding(#[source] jsonwebtoken::errors::Error),
    #[error("failed to hash password")]
    Hash(#[source] bcrypt::BcryptError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Verification port so routers do not care which provider is wired in.
pub trait IdentityProvider: Send + Sync {
    fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// HS256 signer/verifier. `sub` carries the user id, `exp` the expiry.
pub struct JwtIdentityProvider {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_hours: i64,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours,
        }
    }

    pub fn issue(&self, user: &UserId) -> Result<String, AuthError> {
        let exp = (Utc::now() + Duration::hours(self.ttl_hours)).timestamp() as usize;
        let claims = Claims {
            sub: user.to_string(),
            exp,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(AuthError::TokenEncoding)
    }
}

impl IdentityProvider for JwtIdentityProvider {
    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| AuthError::InvalidToken)?;
        let user = Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(Identity {
            user: Some(UserId(user)),
            is_admin: false,
        })
    }
}

/// Decorator accepting a fixed bearer token and yielding an admin identity.
/// Anything else falls through to the wrapped provider.
pub struct DevIdentityProvider {
    token: String,
    inner: Arc<dyn IdentityProvider>,
}

impl DevIdentityProvider {
    pub fn new(token: String, inner: Arc<dyn IdentityProvider>) -> Self {
        Self { token, inner }
    }
}

impl IdentityProvider for DevIdentityProvider {
    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if token == self.token {
            return Ok(Identity {
                user: None,
                is_admin: true,
            });
        }
        self.inner.verify(token)
    }
}

/// Build the provider stack for a deployment. The dev token is honored only
/// outside production; in production it is ignored with a warning.
pub fn provider_for(config: &AppConfig, jwt: Arc<JwtIdentityProvider>) -> Arc<dyn IdentityProvider> {
    match &config.auth.dev_token {
        Some(token) if !config.environment.is_production() => {
            Arc::new(DevIdentityProvider::new(token.clone(), jwt))
        }
        Some(_) => {
            tracing::warn!("dev token configured but ignored in production");
            jwt
        }
        None => jwt,
    }
}

/// Pull the bearer token out of the Authorization header, with or without
/// the `Bearer` prefix.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = raw
        .strip_prefix("Bearer ")
        .or_else(|| raw.strip_prefix("bearer "))
        .unwrap_or(raw)
        .trim();
    (!token.is_empty()).then_some(token)
}

pub fn authenticate(
    provider: &dyn IdentityProvider,
    headers: &HeaderMap,
) -> Result<Identity, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
    provider.verify(token)
}

/// Admins are either the dev identity or a stored user with the admin flag.
pub fn require_admin<S: Storage>(storage: &S, identity: &Identity) -> Result<(), AuthError> {
    if identity.is_admin {
        return Ok(());
    }
    let user_id = identity.user.as_ref().ok_or(AuthError::Forbidden)?;
    match storage.find_user(user_id)? {
        Some(user) if user.is_admin => Ok(()),
        _ => Err(AuthError::Forbidden),
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(AuthError::Hash)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(AuthError::Hash)
}
