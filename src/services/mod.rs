use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::config::AppConfig;
use crate::repository::Repository;

pub mod auth;
pub mod bookmark;
pub mod group;
pub mod list;
pub mod post;
pub mod user;
pub mod validation;

pub use auth::AuthService;
pub use bookmark::BookmarkService;
pub use group::GroupService;
pub use list::ListService;
pub use post::PostService;
pub use user::UserService;

/// Services
///
/// The domain layer: one service per aggregate. Every service receives the
/// requester id explicitly and enforces ownership/visibility before touching
/// a gateway.
pub struct Services {
    pub auth: AuthService,
    pub users: UserService,
    pub posts: PostService,
    pub bookmarks: BookmarkService,
    pub lists: ListService,
    pub groups: GroupService,
}

/// ServiceState
///
/// How the services are shared across the application state.
pub type ServiceState = Arc<Services>;

impl Services {
    /// Wires every service to its gateways. `repo` is split into one trait
    /// object per entity so that services only see what they use.
    pub fn new<R: Repository>(repo: Arc<R>, config: &AppConfig) -> Self {
        let tokens = TokenIssuer::new(config);

        Self {
            auth: AuthService::new(repo.clone(), tokens, config.bcrypt_cost),
            users: UserService::new(repo.clone(), repo.clone(), config.bcrypt_cost),
            posts: PostService::new(
                repo.clone(),
                repo.clone(),
                repo.clone(),
                repo.clone(),
                repo.clone(),
            ),
            bookmarks: BookmarkService::new(
                repo.clone(),
                repo.clone(),
                repo.clone(),
                repo.clone(),
            ),
            lists: ListService::new(repo.clone(), repo.clone(), repo.clone(), repo.clone()),
            groups: GroupService::new(
                repo.clone(),
                repo.clone(),
                repo.clone(),
                repo.clone(),
                repo,
            ),
        }
    }
}
