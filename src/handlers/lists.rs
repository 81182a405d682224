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
        CreateListRequest, List, ListFollower, ListMember, PublicUserView, UpdateListRequest,
    },
};

#[utoipa::path(
    post,
    path = "/lists",
    request_body = CreateListRequest,
    responses(
        (status = 201, description = "Created", body = List),
        (status = 400, description = "Invalid name or description", body = ErrorResponse)
    )
)]
pub async fn create_list(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateListRequest>,
) -> AppResult<(StatusCode, Json<List>)> {
    let list = state.services.lists.create(id, payload).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

/// list_lists
///
/// [Authenticated Route] Public lists plus the caller's private ones.
#[utoipa::path(
    get,
    path = "/lists",
    params(PageQuery),
    responses((status = 200, description = "Visible lists", body = [List]))
)]
pub async fn list_lists(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<List>>> {
    Ok(Json(state.services.lists.find_all(id, &page.into()).await?))
}

#[utoipa::path(
    get,
    path = "/lists/{id}",
    params(("id" = i32, Path, description = "List ID")),
    responses(
        (status = 200, description = "Found", body = List),
        (status = 403, description = "Private list", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn get_list(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<List>> {
    Ok(Json(state.services.lists.find_by_id(id, requester_id).await?))
}

#[utoipa::path(
    put,
    path = "/lists/{id}",
    params(("id" = i32, Path, description = "List ID")),
    request_body = UpdateListRequest,
    responses(
        (status = 200, description = "Updated", body = List),
        (status = 403, description = "Not Creator", body = ErrorResponse)
    )
)]
pub async fn update_list(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateListRequest>,
) -> AppResult<Json<List>> {
    Ok(Json(state.services.lists.update(id, payload, requester_id).await?))
}

#[utoipa::path(
    delete,
    path = "/lists/{id}",
    params(("id" = i32, Path, description = "List ID")),
    responses(
        (status = 204, description = "Deleted with its members and followers"),
        (status = 403, description = "Not Creator", body = ErrorResponse)
    )
)]
pub async fn delete_list(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.lists.delete(id, requester_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/lists/{id}/users",
    params(("id" = i32, Path, description = "List ID"), PageQuery),
    responses(
        (status = 200, description = "Members", body = [PublicUserView]),
        (status = 403, description = "Private list", body = ErrorResponse)
    )
)]
pub async fn get_list_members(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<PublicUserView>>> {
    Ok(Json(
        state
            .services
            .lists
            .find_members(id, requester_id, &page.into())
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/lists/{id}/users/{user_id}",
    params(
        ("id" = i32, Path, description = "List ID"),
        ("user_id" = i32, Path, description = "User to add")
    ),
    responses(
        (status = 201, description = "Member added", body = ListMember),
        (status = 400, description = "Already a member", body = ErrorResponse),
        (status = 403, description = "Not Creator", body = ErrorResponse)
    )
)]
pub async fn add_list_member(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i32, i32)>,
) -> AppResult<(StatusCode, Json<ListMember>)> {
    let member = state
        .services
        .lists
        .add_member(id, user_id, requester_id)
        .await?;
    Ok((StatusCode::CREATED, Json(member)))
}

#[utoipa::path(
    delete,
    path = "/lists/{id}/users/{user_id}",
    params(
        ("id" = i32, Path, description = "List ID"),
        ("user_id" = i32, Path, description = "User to remove")
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 403, description = "Not Creator", body = ErrorResponse),
        (status = 404, description = "Not a member", body = ErrorResponse)
    )
)]
pub async fn remove_list_member(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    state
        .services
        .lists
        .remove_member(id, user_id, requester_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/lists/{id}/follower",
    params(("id" = i32, Path, description = "List ID"), PageQuery),
    responses(
        (status = 200, description = "Followers", body = [PublicUserView]),
        (status = 403, description = "Private list", body = ErrorResponse)
    )
)]
pub async fn get_list_followers(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<PublicUserView>>> {
    Ok(Json(
        state
            .services
            .lists
            .find_followers(id, requester_id, &page.into())
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/lists/{id}/follower",
    params(("id" = i32, Path, description = "List ID")),
    responses(
        (status = 201, description = "Following the list", body = ListFollower),
        (status = 400, description = "Already following", body = ErrorResponse),
        (status = 403, description = "Private list", body = ErrorResponse)
    )
)]
pub async fn follow_list(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<(StatusCode, Json<ListFollower>)> {
    let follower = state.services.lists.follow_list(id, user_id).await?;
    Ok((StatusCode::CREATED, Json(follower)))
}

/// unfollow_list
///
/// [Authenticated Route] A follower leaves, or the creator removes a follower.
#[utoipa::path(
    delete,
    path = "/lists/{id}/follower/{user_id}",
    params(
        ("id" = i32, Path, description = "List ID"),
        ("user_id" = i32, Path, description = "Follower to remove")
    ),
    responses(
        (status = 204, description = "Follow removed"),
        (status = 403, description = "Neither the follower nor the creator", body = ErrorResponse),
        (status = 404, description = "No such follow", body = ErrorResponse)
    )
)]
pub async fn unfollow_list(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    state
        .services
        .lists
        .unfollow_list(id, user_id, requester_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
