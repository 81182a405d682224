use crate::{
    AppState,
    handlers::{auth, bookmarks, groups, lists, posts, users},
};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated Router Module
///
/// Every handler here takes an `AuthUser`, and ownership checks happen in
/// the services with that id. The middleware above this router rejects the
/// request before any handler runs when the token is missing or invalid.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // DELETE /auth
        // Revokes all refresh tokens of the caller.
        .route("/auth", delete(auth::logout))
        // --- Users ---
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{id}/password", put(users::update_password))
        .route("/users/tag/{tag}", get(users::get_user_by_tag))
        .route(
            "/users/{id}/posts",
            get(users::get_user_posts).delete(users::delete_user_posts),
        )
        // POST/DELETE act on the caller following `{id}`.
        .route(
            "/users/{id}/follower",
            get(users::get_followers)
                .post(users::follow_user)
                .delete(users::unfollow_user),
        )
        .route(
            "/users/{id}/follower/{follower_id}",
            delete(users::remove_follower),
        )
        .route("/users/{id}/following", get(users::get_following))
        .route("/users/{id}/lists", get(users::get_user_lists))
        .route("/users/{id}/likes", get(users::get_user_likes))
        .route("/users/{id}/groups", get(users::get_user_groups))
        .route("/users/{id}/join-requests", get(users::get_user_join_requests))
        // --- Posts ---
        .route("/posts", post(posts::create_post).get(posts::list_posts))
        .route(
            "/posts/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/posts/{id}/comments", get(posts::get_comments))
        .route("/posts/{id}/parent", get(posts::get_parent_post))
        .route(
            "/posts/{id}/likes",
            get(posts::get_likes)
                .post(posts::like_post)
                .delete(posts::unlike_post),
        )
        // --- Bookmarks ---
        .route(
            "/bookmarks",
            post(bookmarks::create_bookmark).get(bookmarks::list_bookmarks),
        )
        .route("/bookmarks/{post_id}", delete(bookmarks::delete_bookmark))
        // --- Lists ---
        .route("/lists", post(lists::create_list).get(lists::list_lists))
        .route(
            "/lists/{id}",
            get(lists::get_list)
                .put(lists::update_list)
                .delete(lists::delete_list),
        )
        .route("/lists/{id}/users", get(lists::get_list_members))
        .route(
            "/lists/{id}/users/{user_id}",
            post(lists::add_list_member).delete(lists::remove_list_member),
        )
        .route(
            "/lists/{id}/follower",
            get(lists::get_list_followers).post(lists::follow_list),
        )
        .route(
            "/lists/{id}/follower/{user_id}",
            delete(lists::unfollow_list),
        )
        // --- Groups ---
        .route("/groups", post(groups::create_group).get(groups::list_groups))
        .route(
            "/groups/{id}",
            get(groups::get_group)
                .put(groups::update_group)
                .delete(groups::delete_group),
        )
        .route("/groups/{id}/members", get(groups::get_group_members))
        .route(
            "/groups/{id}/members/{user_id}",
            delete(groups::remove_group_member),
        )
        .route(
            "/groups/{id}/posts",
            get(groups::get_group_posts).delete(groups::delete_group_posts),
        )
        // POST is the caller asking to join.
        .route(
            "/groups/{id}/join-requests",
            get(groups::get_join_requests).post(groups::create_join_request),
        )
        .route(
            "/groups/{id}/join-requests/{user_id}",
            put(groups::decide_join_request).delete(groups::withdraw_join_request),
        )
}
