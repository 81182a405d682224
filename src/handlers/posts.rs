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
    models::{CreatePostRequest, Post, PublicUserView, UpdatePostRequest},
};

/// create_post
///
/// [Authenticated Route] Publishes a post, reply or repost as the caller.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 400, description = "Invalid content or repost without original", body = ErrorResponse),
        (status = 403, description = "Not a member of the target group", body = ErrorResponse),
        (status = 404, description = "Referenced post or group not found", body = ErrorResponse)
    )
)]
pub async fn create_post(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> AppResult<(StatusCode, Json<Post>)> {
    let post = state.services.posts.create(id, payload).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// list_posts
///
/// [Authenticated Route] The timeline. Group posts are only listed through
/// their group.
#[utoipa::path(
    get,
    path = "/posts",
    params(PageQuery),
    responses((status = 200, description = "Timeline", body = [Post]))
)]
pub async fn list_posts(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(state.services.posts.find_all(&page.into()).await?))
}

#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = Post),
        (status = 403, description = "Post of a private group", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn get_post(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Post>> {
    Ok(Json(state.services.posts.find_by_id(id, requester_id).await?))
}

#[utoipa::path(
    put,
    path = "/posts/{id}",
    params(("id" = i32, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 403, description = "Not Author", body = ErrorResponse)
    )
)]
pub async fn update_post(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePostRequest>,
) -> AppResult<Json<Post>> {
    Ok(Json(
        state
            .services
            .posts
            .update(id, payload.content, requester_id)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Author", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn delete_post(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.posts.delete(id, requester_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/posts/{id}/comments",
    params(("id" = i32, Path, description = "Post ID"), PageQuery),
    responses((status = 200, description = "Replies", body = [Post]))
)]
pub async fn get_comments(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(
        state
            .services
            .posts
            .find_children_of_post(id, requester_id, &page.into())
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/posts/{id}/parent",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "The post this one replies to", body = Post),
        (status = 404, description = "No parent", body = ErrorResponse)
    )
)]
pub async fn get_parent_post(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Post>> {
    Ok(Json(
        state
            .services
            .posts
            .find_parent_post(id, requester_id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/posts/{id}/likes",
    params(("id" = i32, Path, description = "Post ID"), PageQuery),
    responses((status = 200, description = "Users who liked the post", body = [PublicUserView]))
)]
pub async fn get_likes(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<PublicUserView>>> {
    Ok(Json(
        state
            .services
            .posts
            .find_likes_of_post(id, requester_id, &page.into())
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/posts/{id}/likes",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 201, description = "Liked"),
        (status = 400, description = "Already liked", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn like_post(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.posts.create_like(id, user_id).await?;
    Ok(StatusCode::CREATED)
}

#[utoipa::path(
    delete,
    path = "/posts/{id}/likes",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Like removed"),
        (status = 404, description = "No like to remove", body = ErrorResponse)
    )
)]
pub async fn unlike_post(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.posts.delete_like(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
