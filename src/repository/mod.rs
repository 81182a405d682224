use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::models::{
    Bookmark, Follow, Group, GroupChanges, GroupJoinRequest, GroupMember, Like, List,
    ListChanges, ListFollower, ListMember, NewGroup, NewList, NewPost, NewUser, Post, User,
    UserChanges,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

// --- Paging ---

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 25;
/// Groups and lists are browsed in smaller pages.
pub const DEFAULT_COLLECTION_PAGE_SIZE: u32 = 10;
/// Upper bound on any single page, whatever the caller asks for.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// OrderField
///
/// The columns a page may be ordered by. Kept as an enum so a caller-supplied
/// value can never reach the SQL text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum OrderField {
    #[default]
    CreatedAt,
    Id,
}

impl OrderField {
    pub fn column(self) -> &'static str {
        match self {
            OrderField::CreatedAt => "created_at",
            OrderField::Id => "id",
        }
    }
}

/// PageOptions
///
/// Paging, ordering and optional id filter shared by every `find_all`-style
/// gateway call. `page` is 1-based. `entries_per_page` falls back to the
/// gateway's default and is capped at [`MAX_PAGE_SIZE`].
#[derive(Debug, Clone, PartialEq)]
pub struct PageOptions {
    pub page: u32,
    pub entries_per_page: Option<u32>,
    pub order_by: SortOrder,
    pub order_by_field: OrderField,
    pub ids: Option<Vec<i32>>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            page: 1,
            entries_per_page: None,
            order_by: SortOrder::default(),
            order_by_field: OrderField::default(),
            ids: None,
        }
    }
}

impl PageOptions {
    /// Batch lookup of exactly these rows, in a single page.
    pub fn for_ids(ids: Vec<i32>) -> Self {
        Self {
            ids: Some(ids),
            ..Self::default()
        }
    }

    /// Effective page size. An id lookup always fits on one page.
    pub fn limit(&self, default: u32) -> i64 {
        match &self.ids {
            Some(ids) => ids.len().max(1) as i64,
            None => i64::from(self.entries_per_page.unwrap_or(default).clamp(1, MAX_PAGE_SIZE)),
        }
    }

    pub fn offset(&self, default: u32) -> i64 {
        if self.ids.is_some() {
            return 0;
        }
        i64::from(self.page.max(1) - 1) * self.limit(default)
    }
}

// --- Gateways ---
//
// One trait per entity. Gateways perform storage operations only: existence and
// ownership rules live in the services. Relationship inserts that collide with
// a uniqueness constraint fail with `AppError::BadRequest`.

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> AppResult<User>;
    /// Setting `password_hash` also bumps the token version, atomically.
    async fn update(&self, id: i32, changes: UserChanges) -> AppResult<Option<User>>;
    /// Soft delete. Also bumps the token version so refresh tokens die with it.
    async fn delete(&self, id: i32) -> AppResult<bool>;
    async fn find_by_id(&self, id: i32) -> AppResult<Option<User>>;
    async fn find_all(&self, options: &PageOptions) -> AppResult<Vec<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_by_user_tag(&self, user_tag: &str) -> AppResult<Option<User>>;
    async fn increment_token_version(&self, id: i32) -> AppResult<bool>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Inserts the post and, for a reply, bumps the parent's `comments_count`.
    async fn create(&self, post: NewPost) -> AppResult<Post>;
    async fn update(&self, id: i32, content: String) -> AppResult<Option<Post>>;
    /// Soft delete; a reply gives its parent's `comments_count` back.
    async fn delete(&self, id: i32) -> AppResult<bool>;
    async fn delete_all_of_user(&self, user_id: i32) -> AppResult<u64>;
    async fn delete_all_of_group(&self, group_id: i32) -> AppResult<u64>;
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Post>>;
    /// Timeline of non-group posts, or exactly `options.ids` when set.
    async fn find_all(&self, options: &PageOptions) -> AppResult<Vec<Post>>;
    async fn find_all_of_user(&self, user_id: i32, options: &PageOptions) -> AppResult<Vec<Post>>;
    async fn find_all_of_group(&self, group_id: i32, options: &PageOptions)
    -> AppResult<Vec<Post>>;
    async fn find_children_of_post(&self, post_id: i32, options: &PageOptions)
    -> AppResult<Vec<Post>>;
}

#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Inserts the like and bumps `likes_count` in one step.
    async fn create(&self, user_id: i32, post_id: i32) -> AppResult<Like>;
    async fn delete(&self, user_id: i32, post_id: i32) -> AppResult<bool>;
    async fn find_by_user_and_post(&self, user_id: i32, post_id: i32) -> AppResult<Option<Like>>;
    async fn find_all_of_user(&self, user_id: i32, options: &PageOptions) -> AppResult<Vec<Like>>;
    async fn find_all_of_post(&self, post_id: i32, options: &PageOptions) -> AppResult<Vec<Like>>;
}

#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    async fn create(&self, user_id: i32, post_id: i32) -> AppResult<Bookmark>;
    async fn delete(&self, user_id: i32, post_id: i32) -> AppResult<bool>;
    async fn find_by_user_and_post(&self, user_id: i32, post_id: i32)
    -> AppResult<Option<Bookmark>>;
    async fn find_all_of_user(&self, user_id: i32, options: &PageOptions)
    -> AppResult<Vec<Bookmark>>;
}

#[async_trait]
pub trait FollowRepository: Send + Sync {
    async fn create(&self, follower_id: i32, following_id: i32) -> AppResult<Follow>;
    async fn delete(&self, follower_id: i32, following_id: i32) -> AppResult<bool>;
    async fn find_by_pair(&self, follower_id: i32, following_id: i32) -> AppResult<Option<Follow>>;
    /// Rows where somebody follows `user_id`.
    async fn find_followers(&self, user_id: i32, options: &PageOptions) -> AppResult<Vec<Follow>>;
    /// Rows where `user_id` follows somebody.
    async fn find_following(&self, user_id: i32, options: &PageOptions) -> AppResult<Vec<Follow>>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Inserts the group and its creator's membership atomically.
    async fn create(&self, group: NewGroup) -> AppResult<Group>;
    async fn update(&self, id: i32, changes: GroupChanges) -> AppResult<Option<Group>>;
    /// Removes members, join requests and posts, then soft-deletes the group,
    /// all in one transaction.
    async fn delete(&self, id: i32) -> AppResult<bool>;
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Group>>;
    /// Public groups plus the private ones `requester_id` belongs to.
    async fn find_visible(&self, requester_id: i32, options: &PageOptions)
    -> AppResult<Vec<Group>>;
    /// Groups `user_id` belongs to, limited to what `viewer_id` may see.
    async fn find_by_member(
        &self,
        user_id: i32,
        viewer_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<Group>>;
}

#[async_trait]
pub trait GroupMemberRepository: Send + Sync {
    async fn delete(&self, user_id: i32, group_id: i32) -> AppResult<bool>;
    async fn find_by_user_and_group(&self, user_id: i32, group_id: i32)
    -> AppResult<Option<GroupMember>>;
    async fn find_all(&self, group_id: i32, options: &PageOptions) -> AppResult<Vec<GroupMember>>;
}

#[async_trait]
pub trait JoinRequestRepository: Send + Sync {
    async fn create(&self, user_id: i32, group_id: i32) -> AppResult<GroupJoinRequest>;
    async fn delete(&self, user_id: i32, group_id: i32) -> AppResult<bool>;
    async fn find_by_user_and_group(
        &self,
        user_id: i32,
        group_id: i32,
    ) -> AppResult<Option<GroupJoinRequest>>;
    async fn find_all(&self, group_id: i32, options: &PageOptions)
    -> AppResult<Vec<GroupJoinRequest>>;
    async fn find_all_by_user(&self, user_id: i32, options: &PageOptions)
    -> AppResult<Vec<GroupJoinRequest>>;
    /// Turns the pending request into a membership admitted by `accepted_by`.
    /// Fails with `NotFound` when no such request is pending.
    async fn accept(&self, user_id: i32, group_id: i32, accepted_by: i32)
    -> AppResult<GroupMember>;
}

#[async_trait]
pub trait ListRepository: Send + Sync {
    async fn create(&self, list: NewList) -> AppResult<List>;
    async fn update(&self, id: i32, changes: ListChanges) -> AppResult<Option<List>>;
    /// Hard delete of the list together with its members and followers.
    async fn delete(&self, id: i32) -> AppResult<bool>;
    async fn find_by_id(&self, id: i32) -> AppResult<Option<List>>;
    async fn find_visible(&self, requester_id: i32, options: &PageOptions) -> AppResult<Vec<List>>;
    async fn find_by_creator(
        &self,
        creator_id: i32,
        viewer_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<List>>;
}

#[async_trait]
pub trait ListMemberRepository: Send + Sync {
    async fn create(&self, user_id: i32, list_id: i32) -> AppResult<ListMember>;
    async fn delete(&self, user_id: i32, list_id: i32) -> AppResult<bool>;
    async fn find_by_user_and_list(&self, user_id: i32, list_id: i32)
    -> AppResult<Option<ListMember>>;
    async fn find_all(&self, list_id: i32, options: &PageOptions) -> AppResult<Vec<ListMember>>;
}

#[async_trait]
pub trait ListFollowerRepository: Send + Sync {
    async fn create(&self, user_id: i32, list_id: i32) -> AppResult<ListFollower>;
    async fn delete(&self, user_id: i32, list_id: i32) -> AppResult<bool>;
    async fn find_by_user_and_list(
        &self,
        user_id: i32,
        list_id: i32,
    ) -> AppResult<Option<ListFollower>>;
    async fn find_all(&self, list_id: i32, options: &PageOptions) -> AppResult<Vec<ListFollower>>;
}

/// Repository
///
/// Every gateway at once. Both backends implement it; `Services::new` is
/// generic over it and splits it into one trait object per entity.
pub trait Repository:
    UserRepository
    + PostRepository
    + LikeRepository
    + BookmarkRepository
    + FollowRepository
    + GroupRepository
    + GroupMemberRepository
    + JoinRequestRepository
    + ListRepository
    + ListMemberRepository
    + ListFollowerRepository
    + 'static
{
}

impl<T> Repository for T where
    T: UserRepository
        + PostRepository
        + LikeRepository
        + BookmarkRepository
        + FollowRepository
        + GroupRepository
        + GroupMemberRepository
        + JoinRequestRepository
        + ListRepository
        + ListMemberRepository
        + ListFollowerRepository
        + 'static
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page_newest_first() {
        let options = PageOptions::default();
        assert_eq!(options.limit(DEFAULT_PAGE_SIZE), 25);
        assert_eq!(options.limit(DEFAULT_COLLECTION_PAGE_SIZE), 10);
        assert_eq!(options.offset(DEFAULT_PAGE_SIZE), 0);
        assert_eq!(options.order_by.as_sql(), "DESC");
        assert_eq!(options.order_by_field.column(), "created_at");
    }

    #[test]
    fn page_size_is_capped() {
        let options = PageOptions {
            page: 3,
            entries_per_page: Some(10_000),
            ..PageOptions::default()
        };
        assert_eq!(options.limit(DEFAULT_PAGE_SIZE), i64::from(MAX_PAGE_SIZE));
        assert_eq!(options.offset(DEFAULT_PAGE_SIZE), 200);
    }

    #[test]
    fn page_zero_is_treated_as_first_page() {
        let options = PageOptions {
            page: 0,
            entries_per_page: Some(5),
            ..PageOptions::default()
        };
        assert_eq!(options.offset(DEFAULT_PAGE_SIZE), 0);
    }

    #[test]
    fn id_lookup_fits_on_one_page() {
        let options = PageOptions::for_ids(vec![4, 9, 2]);
        assert_eq!(options.limit(DEFAULT_PAGE_SIZE), 3);
        assert_eq!(options.offset(DEFAULT_PAGE_SIZE), 0);
    }

    #[test]
    fn sort_params_deserialize_from_query_values() {
        let order: SortOrder = serde_json::from_str("\"asc\"").unwrap();
        let field: OrderField = serde_json::from_str("\"created_at\"").unwrap();
        assert_eq!(order, SortOrder::Asc);
        assert_eq!(field, OrderField::CreatedAt);
        assert!(serde_json::from_str::<OrderField>("\"password\"").is_err());
    }
}
