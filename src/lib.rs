use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod services;

// Public and authenticated route sets.
pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{InMemoryRepository, PostgresRepository};
pub use services::{ServiceState, Services};

/// ApiDoc
///
/// OpenAPI document for every route, served at `/api-docs/openapi.json`
/// and browsable under `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login, handlers::auth::refresh_token, handlers::auth::logout,
        handlers::users::register_user, handlers::users::list_users, handlers::users::get_user,
        handlers::users::get_user_by_tag, handlers::users::update_user,
        handlers::users::update_password, handlers::users::delete_user,
        handlers::users::get_user_posts, handlers::users::delete_user_posts,
        handlers::users::get_followers, handlers::users::get_following,
        handlers::users::follow_user, handlers::users::unfollow_user,
        handlers::users::remove_follower, handlers::users::get_user_lists,
        handlers::users::get_user_likes, handlers::users::get_user_groups,
        handlers::users::get_user_join_requests,
        handlers::posts::create_post, handlers::posts::list_posts, handlers::posts::get_post,
        handlers::posts::update_post, handlers::posts::delete_post,
        handlers::posts::get_comments, handlers::posts::get_parent_post,
        handlers::posts::get_likes, handlers::posts::like_post, handlers::posts::unlike_post,
        handlers::bookmarks::create_bookmark, handlers::bookmarks::list_bookmarks,
        handlers::bookmarks::delete_bookmark,
        handlers::lists::create_list, handlers::lists::list_lists, handlers::lists::get_list,
        handlers::lists::update_list, handlers::lists::delete_list,
        handlers::lists::get_list_members, handlers::lists::add_list_member,
        handlers::lists::remove_list_member, handlers::lists::get_list_followers,
        handlers::lists::follow_list, handlers::lists::unfollow_list,
        handlers::groups::create_group, handlers::groups::list_groups,
        handlers::groups::get_group, handlers::groups::update_group,
        handlers::groups::delete_group, handlers::groups::get_group_members,
        handlers::groups::remove_group_member, handlers::groups::get_group_posts,
        handlers::groups::delete_group_posts, handlers::groups::get_join_requests,
        handlers::groups::create_join_request, handlers::groups::decide_join_request,
        handlers::groups::withdraw_join_request
    ),
    components(
        schemas(
            models::Post, models::Like, models::Bookmark, models::Follow, models::Group,
            models::GroupMember, models::GroupJoinRequest, models::List, models::ListMember,
            models::ListFollower, models::OwnerUserView, models::PublicUserView,
            models::UserView, models::RegisterUserRequest, models::UpdateUserRequest,
            models::UpdatePasswordRequest, models::LoginRequest, models::LoginResponse,
            models::RefreshTokenRequest, models::RefreshTokenResponse,
            models::CreatePostRequest, models::UpdatePostRequest,
            models::CreateBookmarkRequest, models::CreateGroupRequest,
            models::UpdateGroupRequest, models::JoinRequestDecision,
            models::CreateListRequest, models::UpdateListRequest,
            handlers::ErrorResponse, repository::SortOrder, repository::OrderField,
        )
    ),
    tags(
        (name = "social-graph", description = "Users, posts, follows, lists and groups")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Shared by every request. Cloning is cheap: the services sit behind an
/// `Arc` and the configuration is small.
#[derive(Clone)]
pub struct AppState {
    /// Domain layer, already wired to a gateway implementation.
    pub services: ServiceState,
    pub config: AppConfig,
}

impl AppState {
    /// Builds the services on top of `repo` and bundles them with `config`.
    pub fn new<R: repository::Repository>(repo: std::sync::Arc<R>, config: AppConfig) -> Self {
        let services = std::sync::Arc::new(Services::new(repo, &config));
        Self { services, config }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for ServiceState {
    fn from_ref(app_state: &AppState) -> ServiceState {
        app_state.services.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards `authenticated_routes`. Extracting `AuthUser` verifies the Bearer
/// token; a failed extraction short-circuits with 401 before the handler.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles routes, middleware and state into the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    // Request id first so the trace span can pick it up.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// One span per request carrying method, URI and the `x-request-id`, so all
/// log lines of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_both_route_sets() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/auth"));
        assert!(paths.contains_key("/users/{id}/follower/{follower_id}"));
        assert!(paths.contains_key("/groups/{id}/join-requests/{user_id}"));
        assert!(paths.contains_key("/lists/{id}/follower"));
    }
}
