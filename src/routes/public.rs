use crate::{
    AppState,
    handlers::{auth, users},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token: registration, login and the
/// refresh-token exchange.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /users
        .route("/users", post(users::register_user))
        // POST /auth
        // Email or user tag plus password. Returns both tokens and the owner view.
        .route("/auth", post(auth::login))
        // POST /auth/token
        .route("/auth/token", post(auth::refresh_token))
}
