use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Entities (Mapped to Database) ---

/// User
///
/// The full `users` row, including the bcrypt hash. Deliberately not
/// `Serialize`: it only leaves the service layer as one of the audience views
/// below, so a stored hash cannot end up in a response body by accident.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub user_name: Option<String>,
    pub user_tag: String,
    // bcrypt hash, never the plaintext.
    pub password: String,
    pub avatar: Option<String>,
    pub biography: Option<String>,
    // Embedded in refresh tokens; bumping it revokes all of them.
    pub token_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Post
///
/// A post, reply (`parent_post_id`) or repost (`original_post_id` + `is_repost`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct Post {
    pub id: i32,
    pub content: String,
    pub author_id: i32,
    pub likes_count: i32,
    pub comments_count: i32,
    pub parent_post_id: Option<i32>,
    pub original_post_id: Option<i32>,
    pub is_repost: bool,
    pub group_id: Option<i32>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Like
///
/// Membership row: at most one per (user, post).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Like {
    pub id: i32,
    pub user_id: i32,
    pub post_id: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Bookmark {
    pub id: i32,
    pub user_id: i32,
    pub post_id: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Follow
///
/// `follower_id` follows `following_id`. Self-follows never exist.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Follow {
    pub id: i32,
    pub follower_id: i32,
    pub following_id: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct Group {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
    pub creator_id: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// GroupMember
///
/// Membership is the authorization boundary for private groups.
/// `created_by_id` records who admitted the member (the creator).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct GroupMember {
    pub id: i32,
    pub group_id: i32,
    pub user_id: i32,
    pub created_by_id: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// GroupJoinRequest
///
/// A pending request; accepted into a `GroupMember` or removed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct GroupJoinRequest {
    pub id: i32,
    pub group_id: i32,
    pub user_id: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct List {
    pub id: i32,
    pub creator_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// ListMember
///
/// Curated inclusion of a user in a list (distinct from following it).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct ListMember {
    pub id: i32,
    pub list_id: i32,
    pub user_id: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct ListFollower {
    pub id: i32,
    pub list_id: i32,
    pub user_id: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Gateway Inputs (Insert / Change Sets) ---

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub user_tag: String,
    pub password_hash: String,
    pub user_name: Option<String>,
    pub biography: Option<String>,
}

/// UserChanges
///
/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub user_tag: Option<String>,
    pub user_name: Option<String>,
    pub biography: Option<String>,
    pub avatar: Option<String>,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub content: String,
    pub author_id: i32,
    pub parent_post_id: Option<i32>,
    pub original_post_id: Option<i32>,
    pub is_repost: bool,
    pub group_id: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
    pub creator_id: i32,
}

#[derive(Debug, Clone, Default)]
pub struct GroupChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_private: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewList {
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
    pub creator_id: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ListChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_private: Option<bool>,
}

// --- Audience Views (Output) ---

/// OwnerUserView
///
/// What a user sees of their own profile: everything except the hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct OwnerUserView {
    pub id: i32,
    pub email: String,
    pub user_name: Option<String>,
    pub user_tag: String,
    pub avatar: Option<String>,
    pub biography: Option<String>,
    pub token_version: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// PublicUserView
///
/// The strict projection shown to everyone else: no email, no token version.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct PublicUserView {
    pub id: i32,
    pub user_name: Option<String>,
    pub user_tag: String,
    pub avatar: Option<String>,
    pub biography: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// UserView
///
/// Result of a profile lookup, shaped by who is asking.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(untagged)]
#[ts(export)]
pub enum UserView {
    Owner(OwnerUserView),
    Public(PublicUserView),
}

impl From<User> for OwnerUserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            user_name: user.user_name,
            user_tag: user.user_tag,
            avatar: user.avatar,
            biography: user.biography,
            token_version: user.token_version,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<User> for PublicUserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            user_name: user.user_name,
            user_tag: user.user_tag,
            avatar: user.avatar,
            biography: user.biography,
            created_at: user.created_at,
        }
    }
}

impl UserView {
    /// Owner view when the viewer is the subject, strict view otherwise.
    pub fn for_viewer(user: User, viewer_id: i32) -> Self {
        if user.id == viewer_id {
            UserView::Owner(user.into())
        } else {
            UserView::Public(user.into())
        }
    }
}

// --- Request Payloads (Input Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterUserRequest {
    pub email: String,
    pub user_tag: String,
    pub password: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
}

/// UpdateUserRequest
///
/// Partial profile update. Passwords change through their own endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// LoginRequest
///
/// Exactly one of `email` / `user_tag` must be supplied.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_tag: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: OwnerUserView,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RefreshTokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(default)]
    pub parent_post_id: Option<i32>,
    #[serde(default)]
    pub original_post_id: Option<i32>,
    #[serde(default)]
    pub is_repost: Option<bool>,
    #[serde(default)]
    pub group_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdatePostRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateBookmarkRequest {
    pub post_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateGroupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
}

/// JoinRequestDecision
///
/// Body of `PUT /groups/{id}/join-requests/{user_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct JoinRequestDecision {
    pub accept: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateListRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateListRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
}
