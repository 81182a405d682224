#![allow(dead_code)]

use social_graph::{
    AppConfig, AppState, InMemoryRepository, Services,
    models::{OwnerUserView, RegisterUserRequest},
};
use std::sync::Arc;

pub const PASSWORD: &str = "Abcdef1!";

/// Services wired to a fresh in-memory gateway and the test configuration.
pub fn services() -> Services {
    Services::new(Arc::new(InMemoryRepository::new()), &AppConfig::default())
}

/// Full application state over a fresh in-memory gateway.
pub fn app_state() -> AppState {
    AppState::new(Arc::new(InMemoryRepository::new()), AppConfig::default())
}

pub fn registration(tag: &str) -> RegisterUserRequest {
    RegisterUserRequest {
        email: format!("{tag}@example.com"),
        user_tag: tag.to_string(),
        password: PASSWORD.to_string(),
        ..Default::default()
    }
}

/// Registers `tag` with a valid email and the shared test password.
pub async fn register(services: &Services, tag: &str) -> OwnerUserView {
    services
        .users
        .create(registration(tag))
        .await
        .expect("registration should succeed")
}
