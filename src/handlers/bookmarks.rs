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
    models::{Bookmark, CreateBookmarkRequest, Post},
};

#[utoipa::path(
    post,
    path = "/bookmarks",
    request_body = CreateBookmarkRequest,
    responses(
        (status = 201, description = "Bookmarked", body = Bookmark),
        (status = 400, description = "Already bookmarked", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
pub async fn create_bookmark(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateBookmarkRequest>,
) -> AppResult<(StatusCode, Json<Bookmark>)> {
    let bookmark = state.services.bookmarks.create(payload.post_id, id).await?;
    Ok((StatusCode::CREATED, Json(bookmark)))
}

/// list_bookmarks
///
/// [Authenticated Route] The caller's bookmarked posts, newest bookmark first
/// by default.
#[utoipa::path(
    get,
    path = "/bookmarks",
    params(PageQuery),
    responses((status = 200, description = "Bookmarked posts", body = [Post]))
)]
pub async fn list_bookmarks(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(
        state
            .services
            .bookmarks
            .find_bookmarked_by_user(id, &page.into())
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/bookmarks/{post_id}",
    params(("post_id" = i32, Path, description = "Bookmarked post ID")),
    responses(
        (status = 204, description = "Bookmark removed"),
        (status = 404, description = "No such bookmark", body = ErrorResponse)
    )
)]
pub async fn delete_bookmark(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.bookmarks.delete(post_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
