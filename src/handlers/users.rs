use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    handlers::{ErrorResponse, PageQuery},
    models::{
        Group, GroupJoinRequest, List, OwnerUserView, Post, PublicUserView, RegisterUserRequest,
        UpdatePasswordRequest, UpdateUserRequest, UserView,
    },
};

/// register_user
///
/// [Public Route] Creates an account. The response is the owner view of the
/// new user; the password hash never leaves the server.
#[utoipa::path(
    post,
    path = "/users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Registered", body = OwnerUserView),
        (status = 400, description = "Invalid or already used email/user tag, weak password", body = ErrorResponse)
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> AppResult<(StatusCode, Json<OwnerUserView>)> {
    let user = state.services.users.create(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/users",
    params(PageQuery),
    responses((status = 200, description = "Users", body = [PublicUserView]))
)]
pub async fn list_users(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<PublicUserView>>> {
    Ok(Json(state.services.users.find_all(&page.into()).await?))
}

/// get_user
///
/// [Authenticated Route] Owner view when the caller asks for themself, the
/// public view otherwise.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserView),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn get_user(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<UserView>> {
    Ok(Json(state.services.users.find_by_id(id, requester_id).await?))
}

#[utoipa::path(
    get,
    path = "/users/tag/{tag}",
    params(("tag" = String, Path, description = "User tag")),
    responses(
        (status = 200, description = "Found", body = UserView),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn get_user_by_tag(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> AppResult<Json<UserView>> {
    Ok(Json(state.services.users.find_by_tag(&tag, requester_id).await?))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = OwnerUserView),
        (status = 403, description = "Not Owner", body = ErrorResponse)
    )
)]
pub async fn update_user(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<OwnerUserView>> {
    Ok(Json(state.services.users.update(id, payload, requester_id).await?))
}

/// update_password
///
/// [Authenticated Route] Changes the password and revokes all refresh tokens.
#[utoipa::path(
    put,
    path = "/users/{id}/password",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdatePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Old password wrong or new password too weak", body = ErrorResponse),
        (status = 403, description = "Not Owner", body = ErrorResponse)
    )
)]
pub async fn update_password(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> AppResult<StatusCode> {
    state
        .services
        .users
        .update_password(id, payload, requester_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner", body = ErrorResponse)
    )
)]
pub async fn delete_user(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.users.delete(id, requester_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/users/{id}/posts",
    params(("id" = i32, Path, description = "User ID"), PageQuery),
    responses((status = 200, description = "Posts of the user", body = [Post]))
)]
pub async fn get_user_posts(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(state.services.posts.find_posts_of_user(id, &page.into()).await?))
}

#[utoipa::path(
    delete,
    path = "/users/{id}/posts",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "All posts deleted"),
        (status = 403, description = "Not Owner", body = ErrorResponse)
    )
)]
pub async fn delete_user_posts(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state
        .services
        .posts
        .delete_all_of_user(id, requester_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/users/{id}/follower",
    params(("id" = i32, Path, description = "User ID"), PageQuery),
    responses((status = 200, description = "Followers", body = [PublicUserView]))
)]
pub async fn get_followers(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<PublicUserView>>> {
    Ok(Json(state.services.users.find_followers(id, &page.into()).await?))
}

#[utoipa::path(
    get,
    path = "/users/{id}/following",
    params(("id" = i32, Path, description = "User ID"), PageQuery),
    responses((status = 200, description = "Followed users", body = [PublicUserView]))
)]
pub async fn get_following(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<PublicUserView>>> {
    Ok(Json(state.services.users.find_following(id, &page.into()).await?))
}

/// follow_user
///
/// [Authenticated Route] The caller starts following `{id}`.
#[utoipa::path(
    post,
    path = "/users/{id}/follower",
    params(("id" = i32, Path, description = "User to follow")),
    responses(
        (status = 201, description = "Following"),
        (status = 400, description = "Self-follow or already following", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn follow_user(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.users.follow(id, requester_id).await?;
    Ok(StatusCode::CREATED)
}

#[utoipa::path(
    delete,
    path = "/users/{id}/follower",
    params(("id" = i32, Path, description = "User to unfollow")),
    responses(
        (status = 204, description = "Unfollowed"),
        (status = 400, description = "Not following", body = ErrorResponse)
    )
)]
pub async fn unfollow_user(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.users.unfollow(id, requester_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/users/{id}/follower/{follower_id}",
    params(
        ("id" = i32, Path, description = "User ID"),
        ("follower_id" = i32, Path, description = "Follower to remove")
    ),
    responses(
        (status = 204, description = "Follower removed"),
        (status = 403, description = "Not Owner", body = ErrorResponse),
        (status = 404, description = "Not a follower", body = ErrorResponse)
    )
)]
pub async fn remove_follower(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path((id, follower_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    state
        .services
        .users
        .remove_follower(id, follower_id, requester_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/users/{id}/lists",
    params(("id" = i32, Path, description = "User ID"), PageQuery),
    responses((status = 200, description = "Lists created by the user", body = [List]))
)]
pub async fn get_user_lists(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<List>>> {
    Ok(Json(
        state
            .services
            .lists
            .find_lists_of_user(id, requester_id, &page.into())
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/users/{id}/likes",
    params(("id" = i32, Path, description = "User ID"), PageQuery),
    responses((status = 200, description = "Posts liked by the user", body = [Post]))
)]
pub async fn get_user_likes(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(state.services.posts.find_liked_by_user(id, &page.into()).await?))
}

#[utoipa::path(
    get,
    path = "/users/{id}/groups",
    params(("id" = i32, Path, description = "User ID"), PageQuery),
    responses((status = 200, description = "Groups the user belongs to", body = [Group]))
)]
pub async fn get_user_groups(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<Group>>> {
    Ok(Json(
        state
            .services
            .groups
            .find_groups_of_user(id, requester_id, &page.into())
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/users/{id}/join-requests",
    params(("id" = i32, Path, description = "User ID"), PageQuery),
    responses(
        (status = 200, description = "Pending join requests of the user", body = [GroupJoinRequest]),
        (status = 403, description = "Not Owner", body = ErrorResponse)
    )
)]
pub async fn get_user_join_requests(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<GroupJoinRequest>>> {
    Ok(Json(
        state
            .services
            .groups
            .find_join_requests_of_user(id, requester_id, &page.into())
            .await?,
    ))
}
