use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
    get_current_timestamp,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::User,
    services::ServiceState,
};

// --- Password Hashing ---

/// hash_password
///
/// Salted bcrypt hash at the configured cost. bcrypt is CPU-bound, so it runs
/// on the blocking pool instead of stalling the async workers.
pub async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::internal(format!("hashing task failed: {e}")))?
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

/// verify_password
///
/// `Ok(false)` for a mismatch; `Err` only when the stored hash is unreadable.
pub async fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::internal(format!("verification task failed: {e}")))?
        .map_err(|e| AppError::internal(format!("password verification failed: {e}")))
}

// --- Token Claims ---

/// AccessClaims
///
/// Payload of the short-lived access token. `sub` is the user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessClaims {
    pub sub: String,
    pub email: String,
    #[serde(rename = "userTag")]
    pub user_tag: String,
    pub exp: u64,
    pub iat: u64,
}

impl AccessClaims {
    pub fn user_id(&self) -> AppResult<i32> {
        self.sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid token subject"))
    }
}

/// RefreshClaims
///
/// Payload of the long-lived refresh token. Only valid while `token_version`
/// still equals the user's stored counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshClaims {
    pub sub: String,
    #[serde(rename = "tokenVersion")]
    pub token_version: i32,
    pub exp: u64,
    pub iat: u64,
}

impl RefreshClaims {
    pub fn user_id(&self) -> AppResult<i32> {
        self.sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid token subject"))
    }
}

// --- Token Issuer ---

/// TokenIssuer
///
/// Signs and verifies both token kinds. Access and refresh tokens use distinct
/// HMAC secrets so one can never be replayed as the other.
#[derive(Clone)]
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            access_ttl_secs: config.access_token_ttl_secs,
            refresh_ttl_secs: config.refresh_token_ttl_secs,
        }
    }

    pub fn issue_access_token(&self, user: &User) -> AppResult<String> {
        let iat = get_current_timestamp();
        let claims = AccessClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            user_tag: user.user_tag.clone(),
            exp: iat + self.access_ttl_secs,
            iat,
        };
        encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(|e| AppError::internal(format!("failed to sign access token: {e}")))
    }

    pub fn issue_refresh_token(&self, user: &User) -> AppResult<String> {
        let iat = get_current_timestamp();
        let claims = RefreshClaims {
            sub: user.id.to_string(),
            token_version: user.token_version,
            exp: iat + self.refresh_ttl_secs,
            iat,
        };
        encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(|e| AppError::internal(format!("failed to sign refresh token: {e}")))
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<AccessClaims> {
        decode::<AccessClaims>(token, &self.access_decoding, &validation())
            .map(|data| data.claims)
            .map_err(token_rejection)
    }

    pub fn verify_refresh_token(&self, token: &str) -> AppResult<RefreshClaims> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &validation())
            .map(|data| data.claims)
            .map_err(token_rejection)
    }
}

fn validation() -> Validation {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation
}

fn token_rejection(e: jsonwebtoken::errors::Error) -> AppError {
    match e.kind() {
        ErrorKind::ExpiredSignature => AppError::unauthorized("Token expired"),
        _ => AppError::unauthorized("Invalid token"),
    }
}

// --- Request Identity ---

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers pass `id` to
/// the services as the requester.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub email: String,
    pub user_tag: String,
}

/// AuthUser Extractor Implementation
///
/// 1. Reads the `Authorization: Bearer <token>` header.
/// 2. Verifies the access token through the auth service.
/// 3. Confirms the subject still exists, so tokens of deleted users stop
///    working before they expire.
///
/// Rejection: `AppError::Unauthorized`, rendered as 401.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    ServiceState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let services = ServiceState::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::unauthorized("Missing bearer token"))?;

        let claims = services.auth.authenticate(token).await?;

        Ok(AuthUser {
            id: claims.user_id()?,
            email: claims.email,
            user_tag: claims.user_tag,
        })
    }
}
