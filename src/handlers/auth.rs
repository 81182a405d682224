use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    handlers::ErrorResponse,
    models::{LoginRequest, LoginResponse, RefreshTokenRequest, RefreshTokenResponse},
};

/// login
///
/// [Public Route] Exchanges an email or user tag plus password for an access
/// token, a refresh token and the caller's own profile.
#[utoipa::path(
    post,
    path = "/auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Neither or both identifiers given", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    Ok(Json(state.services.auth.login(payload).await?))
}

/// refresh_token
///
/// [Public Route] Issues a new access token from a refresh token that has not
/// been revoked.
#[utoipa::path(
    post,
    path = "/auth/token",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New access token", body = RefreshTokenResponse),
        (status = 401, description = "Invalid, expired or revoked refresh token", body = ErrorResponse)
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> AppResult<Json<RefreshTokenResponse>> {
    let token = state
        .services
        .auth
        .refresh_access_token(&payload.refresh_token)
        .await?;
    Ok(Json(RefreshTokenResponse { token }))
}

/// logout
///
/// [Authenticated Route] Revokes every refresh token of the caller.
#[utoipa::path(
    delete,
    path = "/auth",
    responses((status = 204, description = "Refresh tokens revoked"))
)]
pub async fn logout(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<StatusCode> {
    state.services.auth.logout(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
