use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::auth::{AccessClaims, TokenIssuer, hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::models::{LoginRequest, LoginResponse};
use crate::repository::UserRepository;
use crate::services::validation::validate_id;

/// Deliberately the same for unknown identifiers and wrong passwords.
pub const INVALID_CREDENTIALS: &str = "Invalid password or email or user tag";

// Verified against when the identifier is unknown, so both failures cost a
// bcrypt verification.
const PLACEHOLDER_PASSWORD: &str = "placeholder-for-unknown-users";

/// AuthService
///
/// Credential checks and the access/refresh token lifecycle.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: TokenIssuer,
    bcrypt_cost: u32,
    placeholder_hash: OnceCell<String>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenIssuer, bcrypt_cost: u32) -> Self {
        Self {
            users,
            tokens,
            bcrypt_cost,
            placeholder_hash: OnceCell::new(),
        }
    }

    /// Hashed once, at the configured cost, on first use.
    async fn placeholder_hash(&self) -> AppResult<&str> {
        self.placeholder_hash
            .get_or_try_init(|| hash_password(PLACEHOLDER_PASSWORD, self.bcrypt_cost))
            .await
            .map(String::as_str)
    }

    /// login
    ///
    /// Accepts exactly one of email / user tag (a blank value counts as
    /// absent) plus the password.
    pub async fn login(&self, credentials: LoginRequest) -> AppResult<LoginResponse> {
        let email = non_blank(credentials.email.as_deref());
        let user_tag = non_blank(credentials.user_tag.as_deref());

        let user = match (email, user_tag) {
            (Some(email), None) => self.users.find_by_email(email).await?,
            (None, Some(user_tag)) => self.users.find_by_user_tag(user_tag).await?,
            _ => {
                return Err(AppError::bad_request(
                    "Provide either an email or a user tag, not both",
                ));
            }
        };

        let Some(user) = user else {
            verify_password(&credentials.password, self.placeholder_hash().await?).await?;
            tracing::info!("Login rejected: unknown identifier");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        };

        if !verify_password(&credentials.password, &user.password).await? {
            tracing::info!(user_id = user.id, "Login rejected: wrong password");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        let token = self.tokens.issue_access_token(&user)?;
        let refresh_token = self.tokens.issue_refresh_token(&user)?;
        tracing::info!(user_id = user.id, "User logged in");

        Ok(LoginResponse {
            token,
            refresh_token,
            user: user.into(),
        })
    }

    /// refresh_access_token
    ///
    /// Issues a new access token while the refresh token's version still
    /// matches the user's counter.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> AppResult<String> {
        let claims = self.tokens.verify_refresh_token(refresh_token)?;

        let user = self
            .users
            .find_by_id(claims.user_id()?)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid refresh token"))?;

        if user.token_version != claims.token_version {
            tracing::warn!(user_id = user.id, "Revoked refresh token presented");
            return Err(AppError::unauthorized("Refresh token has been revoked"));
        }

        self.tokens.issue_access_token(&user)
    }

    pub fn get_information_from_access_token(&self, token: &str) -> AppResult<AccessClaims> {
        self.tokens.verify_access_token(token)
    }

    /// authenticate
    ///
    /// Access token verification plus a check that the subject still exists.
    pub async fn authenticate(&self, token: &str) -> AppResult<AccessClaims> {
        let claims = self.get_information_from_access_token(token)?;

        if self.users.find_by_id(claims.user_id()?).await?.is_none() {
            return Err(AppError::unauthorized("User no longer exists"));
        }

        Ok(claims)
    }

    /// logout
    ///
    /// Bumps the token version, revoking every outstanding refresh token.
    /// Access tokens stay valid until they expire.
    pub async fn logout(&self, user_id: i32) -> AppResult<()> {
        validate_id(user_id)?;

        if !self.users.increment_token_version(user_id).await? {
            return Err(AppError::not_found("User not found"));
        }

        tracing::info!(user_id, "Refresh tokens revoked");
        Ok(())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
