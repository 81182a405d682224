use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    handlers::{ErrorResponse, PageQuery},
    models::{
        CreateGroupRequest, Group, GroupJoinRequest, GroupMember, JoinRequestDecision, Post,
        PublicUserView, UpdateGroupRequest,
    },
};

/// create_group
///
/// [Authenticated Route] Creates a group with the caller as creator and
/// first member.
#[utoipa::path(
    post,
    path = "/groups",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Created", body = Group),
        (status = 400, description = "Invalid name or description", body = ErrorResponse)
    )
)]
pub async fn create_group(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateGroupRequest>,
) -> AppResult<(StatusCode, Json<Group>)> {
    let group = state.services.groups.create(id, payload).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

#[utoipa::path(
    get,
    path = "/groups",
    params(PageQuery),
    responses((status = 200, description = "Public groups and private groups of the caller", body = [Group]))
)]
pub async fn list_groups(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<Group>>> {
    Ok(Json(state.services.groups.find_all(id, &page.into()).await?))
}

#[utoipa::path(
    get,
    path = "/groups/{id}",
    params(("id" = i32, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Found", body = Group),
        (status = 403, description = "Private group", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn get_group(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Group>> {
    Ok(Json(state.services.groups.find_by_id(id, requester_id).await?))
}

#[utoipa::path(
    put,
    path = "/groups/{id}",
    params(("id" = i32, Path, description = "Group ID")),
    request_body = UpdateGroupRequest,
    responses(
        (status = 200, description = "Updated", body = Group),
        (status = 403, description = "Not Creator", body = ErrorResponse)
    )
)]
pub async fn update_group(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateGroupRequest>,
) -> AppResult<Json<Group>> {
    Ok(Json(
        state
            .services
            .groups
            .update(id, payload, requester_id)
            .await?,
    ))
}

/// delete_group
///
/// [Authenticated Route] Removes the group with its members, pending join
/// requests and posts.
#[utoipa::path(
    delete,
    path = "/groups/{id}",
    params(("id" = i32, Path, description = "Group ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Creator", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn delete_group(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.groups.delete(id, requester_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/groups/{id}/members",
    params(("id" = i32, Path, description = "Group ID"), PageQuery),
    responses(
        (status = 200, description = "Members", body = [PublicUserView]),
        (status = 403, description = "Private group", body = ErrorResponse)
    )
)]
pub async fn get_group_members(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<PublicUserView>>> {
    Ok(Json(
        state
            .services
            .groups
            .find_members(id, requester_id, &page.into())
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/groups/{id}/members/{user_id}",
    params(
        ("id" = i32, Path, description = "Group ID"),
        ("user_id" = i32, Path, description = "Member to remove")
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 403, description = "Neither creator nor the member, or the creator leaving", body = ErrorResponse),
        (status = 404, description = "Not a member", body = ErrorResponse)
    )
)]
pub async fn remove_group_member(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    state
        .services
        .groups
        .remove_member(id, user_id, requester_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/groups/{id}/posts",
    params(("id" = i32, Path, description = "Group ID"), PageQuery),
    responses(
        (status = 200, description = "Posts of the group", body = [Post]),
        (status = 403, description = "Private group", body = ErrorResponse)
    )
)]
pub async fn get_group_posts(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(
        state
            .services
            .groups
            .find_posts(id, requester_id, &page.into())
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/groups/{id}/posts",
    params(("id" = i32, Path, description = "Group ID")),
    responses(
        (status = 204, description = "All posts of the group deleted"),
        (status = 403, description = "Not Creator", body = ErrorResponse)
    )
)]
pub async fn delete_group_posts(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state
        .services
        .groups
        .delete_all_posts(id, requester_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/groups/{id}/join-requests",
    params(("id" = i32, Path, description = "Group ID"), PageQuery),
    responses(
        (status = 200, description = "Users with a pending join request", body = [PublicUserView]),
        (status = 403, description = "Not Creator", body = ErrorResponse)
    )
)]
pub async fn get_join_requests(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<PublicUserView>>> {
    Ok(Json(
        state
            .services
            .groups
            .find_join_requests(id, requester_id, &page.into())
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/groups/{id}/join-requests",
    params(("id" = i32, Path, description = "Group ID")),
    responses(
        (status = 201, description = "Join request sent", body = GroupJoinRequest),
        (status = 400, description = "Already a member or already requested", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn create_join_request(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<(StatusCode, Json<GroupJoinRequest>)> {
    let request = state
        .services
        .groups
        .create_join_request(id, user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// decide_join_request
///
/// [Authenticated Route] The creator accepts (`201` with the new membership)
/// or rejects (`204`) a pending request.
#[utoipa::path(
    put,
    path = "/groups/{id}/join-requests/{user_id}",
    params(
        ("id" = i32, Path, description = "Group ID"),
        ("user_id" = i32, Path, description = "User who asked to join")
    ),
    request_body = JoinRequestDecision,
    responses(
        (status = 201, description = "Accepted", body = GroupMember),
        (status = 204, description = "Rejected"),
        (status = 403, description = "Not Creator", body = ErrorResponse),
        (status = 404, description = "No pending request", body = ErrorResponse)
    )
)]
pub async fn decide_join_request(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i32, i32)>,
    Json(decision): Json<JoinRequestDecision>,
) -> AppResult<Response> {
    let groups = &state.services.groups;
    if decision.accept {
        let member = groups.accept_join_request(id, user_id, requester_id).await?;
        Ok((StatusCode::CREATED, Json(member)).into_response())
    } else {
        groups.reject_join_request(id, user_id, requester_id).await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}

#[utoipa::path(
    delete,
    path = "/groups/{id}/join-requests/{user_id}",
    params(
        ("id" = i32, Path, description = "Group ID"),
        ("user_id" = i32, Path, description = "User withdrawing the request")
    ),
    responses(
        (status = 204, description = "Join request withdrawn"),
        (status = 403, description = "Not your request", body = ErrorResponse),
        (status = 404, description = "No pending request", body = ErrorResponse)
    )
)]
pub async fn withdraw_join_request(
    AuthUser { id: requester_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    state
        .services
        .groups
        .delete_join_request(id, user_id, requester_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
