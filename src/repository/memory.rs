use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    BookmarkRepository, DEFAULT_COLLECTION_PAGE_SIZE, DEFAULT_PAGE_SIZE, FollowRepository,
    GroupMemberRepository, GroupRepository, JoinRequestRepository, LikeRepository,
    ListFollowerRepository, ListMemberRepository, ListRepository, OrderField, PageOptions,
    PostRepository, SortOrder, UserRepository,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    Bookmark, Follow, Group, GroupChanges, GroupJoinRequest, GroupMember, Like, List,
    ListChanges, ListFollower, ListMember, NewGroup, NewList, NewPost, NewUser, Post, User,
    UserChanges,
};

/// InMemoryRepository
///
/// A process-local implementation of every gateway, used by the test suites
/// and for running the service layer without a database. A single write lock
/// guards all tables, so each gateway call (compound ones included) is atomic,
/// and the same uniqueness rules as the SQL schema are enforced.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Default)]
struct Tables {
    users: Table<User>,
    posts: Table<Post>,
    likes: Table<Like>,
    bookmarks: Table<Bookmark>,
    follows: Table<Follow>,
    groups: Table<Group>,
    group_members: Table<GroupMember>,
    join_requests: Table<GroupJoinRequest>,
    lists: Table<List>,
    list_members: Table<ListMember>,
    list_followers: Table<ListFollower>,
}

impl Tables {
    fn is_group_member(&self, user_id: i32, group_id: i32) -> bool {
        self.group_members
            .rows
            .iter()
            .any(|m| m.user_id == user_id && m.group_id == group_id)
    }

    fn group_visible_to(&self, group: &Group, viewer_id: i32) -> bool {
        !group.is_private || self.is_group_member(viewer_id, group.id)
    }
}

/// Rows plus a SERIAL-like id sequence. Ids are never reused.
struct Table<T> {
    rows: Vec<T>,
    last_id: i32,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            last_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }
}

trait Record: Clone {
    fn id(&self) -> i32;
    fn created_at(&self) -> DateTime<Utc>;
}

macro_rules! impl_record {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Record for $ty {
                fn id(&self) -> i32 {
                    self.id
                }

                fn created_at(&self) -> DateTime<Utc> {
                    self.created_at
                }
            }
        )*
    };
}

impl_record!(
    User,
    Post,
    Like,
    Bookmark,
    Follow,
    Group,
    GroupMember,
    GroupJoinRequest,
    List,
    ListMember,
    ListFollower,
);

/// Applies the id filter, ordering and page window of `options`, mirroring
/// what the SQL gateway does with `ORDER BY .. LIMIT .. OFFSET`.
fn paginate<'a, T, I>(rows: I, options: &PageOptions, default_size: u32) -> Vec<T>
where
    T: Record + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut selected: Vec<T> = rows
        .into_iter()
        .filter(|row| match &options.ids {
            Some(ids) => ids.contains(&row.id()),
            None => true,
        })
        .cloned()
        .collect();

    selected.sort_by(|a, b| {
        let ordering = match options.order_by_field {
            OrderField::CreatedAt => a
                .created_at()
                .cmp(&b.created_at())
                .then(a.id().cmp(&b.id())),
            OrderField::Id => a.id().cmp(&b.id()),
        };
        match options.order_by {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });

    selected
        .into_iter()
        .skip(options.offset(default_size) as usize)
        .take(options.limit(default_size) as usize)
        .collect()
}

fn already_exists(what: &str) -> AppError {
    AppError::bad_request(format!("{what} already exists"))
}

/// Soft-deletes the live posts matching `scope` and returns their parents'
/// comment counts.
fn soft_delete_posts(posts: &mut Table<Post>, scope: impl Fn(&Post) -> bool) -> u64 {
    let now = Utc::now();
    let mut parents = Vec::new();
    let mut removed = 0;

    for post in posts
        .rows
        .iter_mut()
        .filter(|p| p.deleted_at.is_none() && scope(p))
    {
        post.deleted_at = Some(now);
        removed += 1;
        if let Some(parent_id) = post.parent_post_id {
            parents.push(parent_id);
        }
    }

    for parent_id in parents {
        if let Some(parent) = posts.rows.iter_mut().find(|p| p.id == parent_id) {
            parent.comments_count = (parent.comments_count - 1).max(0);
        }
    }

    removed
}

// --- Users ---

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .users
            .rows
            .iter()
            .any(|u| u.email == user.email || u.user_tag == user.user_tag);
        if taken {
            return Err(already_exists("User"));
        }

        let now = Utc::now();
        let created = User {
            id: tables.users.next_id(),
            email: user.email,
            user_name: user.user_name,
            user_tag: user.user_tag,
            password: user.password_hash,
            avatar: None,
            biography: user.biography,
            token_version: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.users.rows.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, changes: UserChanges) -> AppResult<Option<User>> {
        let mut tables = self.tables.write().await;
        let conflicting = tables.users.rows.iter().any(|u| {
            u.id != id
                && (changes.email.as_deref() == Some(u.email.as_str())
                    || changes.user_tag.as_deref() == Some(u.user_tag.as_str()))
        });
        if conflicting {
            return Err(already_exists("User"));
        }

        let Some(user) = tables
            .users
            .rows
            .iter_mut()
            .find(|u| u.id == id && u.deleted_at.is_none())
        else {
            return Ok(None);
        };

        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(user_tag) = changes.user_tag {
            user.user_tag = user_tag;
        }
        if let Some(user_name) = changes.user_name {
            user.user_name = Some(user_name);
        }
        if let Some(biography) = changes.biography {
            user.biography = Some(biography);
        }
        if let Some(avatar) = changes.avatar {
            user.avatar = Some(avatar);
        }
        if let Some(password_hash) = changes.password_hash {
            user.password = password_hash;
            user.token_version += 1;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables
            .users
            .rows
            .iter_mut()
            .find(|u| u.id == id && u.deleted_at.is_none())
        {
            Some(user) => {
                user.deleted_at = Some(Utc::now());
                user.token_version += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .rows
            .iter()
            .find(|u| u.id == id && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_all(&self, options: &PageOptions) -> AppResult<Vec<User>> {
        let tables = self.tables.read().await;
        let live = tables.users.rows.iter().filter(|u| u.deleted_at.is_none());
        Ok(paginate(live, options, DEFAULT_PAGE_SIZE))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .rows
            .iter()
            .find(|u| u.email == email && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_user_tag(&self, user_tag: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .rows
            .iter()
            .find(|u| u.user_tag == user_tag && u.deleted_at.is_none())
            .cloned())
    }

    async fn increment_token_version(&self, id: i32) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables
            .users
            .rows
            .iter_mut()
            .find(|u| u.id == id && u.deleted_at.is_none())
        {
            Some(user) => {
                user.token_version += 1;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// --- Posts ---

#[async_trait]
impl PostRepository for InMemoryRepository {
    async fn create(&self, post: NewPost) -> AppResult<Post> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let created = Post {
            id: tables.posts.next_id(),
            content: post.content,
            author_id: post.author_id,
            likes_count: 0,
            comments_count: 0,
            parent_post_id: post.parent_post_id,
            original_post_id: post.original_post_id,
            is_repost: post.is_repost,
            group_id: post.group_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        if let Some(parent_id) = created.parent_post_id {
            if let Some(parent) = tables.posts.rows.iter_mut().find(|p| p.id == parent_id) {
                parent.comments_count += 1;
            }
        }

        tables.posts.rows.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, content: String) -> AppResult<Option<Post>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .posts
            .rows
            .iter_mut()
            .find(|p| p.id == id && p.deleted_at.is_none())
            .map(|post| {
                post.content = content;
                post.updated_at = Utc::now();
                post.clone()
            }))
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(soft_delete_posts(&mut tables.posts, |p| p.id == id) > 0)
    }

    async fn delete_all_of_user(&self, user_id: i32) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        Ok(soft_delete_posts(&mut tables.posts, |p| p.author_id == user_id))
    }

    async fn delete_all_of_group(&self, group_id: i32) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        Ok(soft_delete_posts(&mut tables.posts, |p| {
            p.group_id == Some(group_id)
        }))
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<Post>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .rows
            .iter()
            .find(|p| p.id == id && p.deleted_at.is_none())
            .cloned())
    }

    async fn find_all(&self, options: &PageOptions) -> AppResult<Vec<Post>> {
        let tables = self.tables.read().await;
        let by_ids = options.ids.is_some();
        let live = tables
            .posts
            .rows
            .iter()
            .filter(|p| p.deleted_at.is_none() && (by_ids || p.group_id.is_none()));
        Ok(paginate(live, options, DEFAULT_PAGE_SIZE))
    }

    async fn find_all_of_user(&self, user_id: i32, options: &PageOptions) -> AppResult<Vec<Post>> {
        let tables = self.tables.read().await;
        let rows = tables.posts.rows.iter().filter(|p| {
            p.deleted_at.is_none() && p.group_id.is_none() && p.author_id == user_id
        });
        Ok(paginate(rows, options, DEFAULT_PAGE_SIZE))
    }

    async fn find_all_of_group(
        &self,
        group_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<Post>> {
        let tables = self.tables.read().await;
        let rows = tables
            .posts
            .rows
            .iter()
            .filter(|p| p.deleted_at.is_none() && p.group_id == Some(group_id));
        Ok(paginate(rows, options, DEFAULT_PAGE_SIZE))
    }

    async fn find_children_of_post(
        &self,
        post_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<Post>> {
        let tables = self.tables.read().await;
        let rows = tables
            .posts
            .rows
            .iter()
            .filter(|p| p.deleted_at.is_none() && p.parent_post_id == Some(post_id));
        Ok(paginate(rows, options, DEFAULT_PAGE_SIZE))
    }
}

// --- Likes ---

#[async_trait]
impl LikeRepository for InMemoryRepository {
    async fn create(&self, user_id: i32, post_id: i32) -> AppResult<Like> {
        let mut tables = self.tables.write().await;
        if tables
            .likes
            .rows
            .iter()
            .any(|l| l.user_id == user_id && l.post_id == post_id)
        {
            return Err(already_exists("Like"));
        }

        let like = Like {
            id: tables.likes.next_id(),
            user_id,
            post_id,
            created_at: Utc::now(),
        };
        tables.likes.rows.push(like.clone());
        if let Some(post) = tables.posts.rows.iter_mut().find(|p| p.id == post_id) {
            post.likes_count += 1;
        }
        Ok(like)
    }

    async fn delete(&self, user_id: i32, post_id: i32) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.likes.rows.len();
        tables
            .likes
            .rows
            .retain(|l| !(l.user_id == user_id && l.post_id == post_id));
        if tables.likes.rows.len() == before {
            return Ok(false);
        }

        if let Some(post) = tables.posts.rows.iter_mut().find(|p| p.id == post_id) {
            post.likes_count = (post.likes_count - 1).max(0);
        }
        Ok(true)
    }

    async fn find_by_user_and_post(&self, user_id: i32, post_id: i32) -> AppResult<Option<Like>> {
        let tables = self.tables.read().await;
        Ok(tables
            .likes
            .rows
            .iter()
            .find(|l| l.user_id == user_id && l.post_id == post_id)
            .cloned())
    }

    async fn find_all_of_user(&self, user_id: i32, options: &PageOptions) -> AppResult<Vec<Like>> {
        let tables = self.tables.read().await;
        let rows = tables.likes.rows.iter().filter(|l| l.user_id == user_id);
        Ok(paginate(rows, options, DEFAULT_PAGE_SIZE))
    }

    async fn find_all_of_post(&self, post_id: i32, options: &PageOptions) -> AppResult<Vec<Like>> {
        let tables = self.tables.read().await;
        let rows = tables.likes.rows.iter().filter(|l| l.post_id == post_id);
        Ok(paginate(rows, options, DEFAULT_PAGE_SIZE))
    }
}

// --- Bookmarks ---

#[async_trait]
impl BookmarkRepository for InMemoryRepository {
    async fn create(&self, user_id: i32, post_id: i32) -> AppResult<Bookmark> {
        let mut tables = self.tables.write().await;
        if tables
            .bookmarks
            .rows
            .iter()
            .any(|b| b.user_id == user_id && b.post_id == post_id)
        {
            return Err(already_exists("Bookmark"));
        }

        let bookmark = Bookmark {
            id: tables.bookmarks.next_id(),
            user_id,
            post_id,
            created_at: Utc::now(),
        };
        tables.bookmarks.rows.push(bookmark.clone());
        Ok(bookmark)
    }

    async fn delete(&self, user_id: i32, post_id: i32) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.bookmarks.rows.len();
        tables
            .bookmarks
            .rows
            .retain(|b| !(b.user_id == user_id && b.post_id == post_id));
        Ok(tables.bookmarks.rows.len() < before)
    }

    async fn find_by_user_and_post(
        &self,
        user_id: i32,
        post_id: i32,
    ) -> AppResult<Option<Bookmark>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookmarks
            .rows
            .iter()
            .find(|b| b.user_id == user_id && b.post_id == post_id)
            .cloned())
    }

    async fn find_all_of_user(
        &self,
        user_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<Bookmark>> {
        let tables = self.tables.read().await;
        let rows = tables.bookmarks.rows.iter().filter(|b| b.user_id == user_id);
        Ok(paginate(rows, options, DEFAULT_PAGE_SIZE))
    }
}

// --- Follows ---

#[async_trait]
impl FollowRepository for InMemoryRepository {
    async fn create(&self, follower_id: i32, following_id: i32) -> AppResult<Follow> {
        let mut tables = self.tables.write().await;
        if follower_id == following_id {
            return Err(AppError::bad_request("Users cannot follow themselves"));
        }
        if tables
            .follows
            .rows
            .iter()
            .any(|f| f.follower_id == follower_id && f.following_id == following_id)
        {
            return Err(already_exists("Follow"));
        }

        let follow = Follow {
            id: tables.follows.next_id(),
            follower_id,
            following_id,
            created_at: Utc::now(),
        };
        tables.follows.rows.push(follow.clone());
        Ok(follow)
    }

    async fn delete(&self, follower_id: i32, following_id: i32) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.rows.len();
        tables
            .follows
            .rows
            .retain(|f| !(f.follower_id == follower_id && f.following_id == following_id));
        Ok(tables.follows.rows.len() < before)
    }

    async fn find_by_pair(&self, follower_id: i32, following_id: i32) -> AppResult<Option<Follow>> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .rows
            .iter()
            .find(|f| f.follower_id == follower_id && f.following_id == following_id)
            .cloned())
    }

    async fn find_followers(&self, user_id: i32, options: &PageOptions) -> AppResult<Vec<Follow>> {
        let tables = self.tables.read().await;
        let rows = tables.follows.rows.iter().filter(|f| f.following_id == user_id);
        Ok(paginate(rows, options, DEFAULT_PAGE_SIZE))
    }

    async fn find_following(&self, user_id: i32, options: &PageOptions) -> AppResult<Vec<Follow>> {
        let tables = self.tables.read().await;
        let rows = tables.follows.rows.iter().filter(|f| f.follower_id == user_id);
        Ok(paginate(rows, options, DEFAULT_PAGE_SIZE))
    }
}

// --- Groups ---

#[async_trait]
impl GroupRepository for InMemoryRepository {
    async fn create(&self, group: NewGroup) -> AppResult<Group> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let created = Group {
            id: tables.groups.next_id(),
            name: group.name,
            description: group.description,
            is_private: group.is_private,
            creator_id: group.creator_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let membership = GroupMember {
            id: tables.group_members.next_id(),
            group_id: created.id,
            user_id: created.creator_id,
            created_by_id: created.creator_id,
            created_at: now,
        };

        tables.groups.rows.push(created.clone());
        tables.group_members.rows.push(membership);
        Ok(created)
    }

    async fn update(&self, id: i32, changes: GroupChanges) -> AppResult<Option<Group>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .groups
            .rows
            .iter_mut()
            .find(|g| g.id == id && g.deleted_at.is_none())
            .map(|group| {
                if let Some(name) = changes.name {
                    group.name = name;
                }
                if let Some(description) = changes.description {
                    group.description = Some(description);
                }
                if let Some(is_private) = changes.is_private {
                    group.is_private = is_private;
                }
                group.updated_at = Utc::now();
                group.clone()
            }))
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables
            .groups
            .rows
            .iter()
            .any(|g| g.id == id && g.deleted_at.is_none())
        {
            return Ok(false);
        }

        tables.group_members.rows.retain(|m| m.group_id != id);
        tables.join_requests.rows.retain(|r| r.group_id != id);
        soft_delete_posts(&mut tables.posts, |p| p.group_id == Some(id));
        if let Some(group) = tables.groups.rows.iter_mut().find(|g| g.id == id) {
            group.deleted_at = Some(Utc::now());
        }
        Ok(true)
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables
            .groups
            .rows
            .iter()
            .find(|g| g.id == id && g.deleted_at.is_none())
            .cloned())
    }

    async fn find_visible(
        &self,
        requester_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<Group>> {
        let tables = self.tables.read().await;
        let rows = tables
            .groups
            .rows
            .iter()
            .filter(|g| g.deleted_at.is_none() && tables.group_visible_to(g, requester_id));
        Ok(paginate(rows, options, DEFAULT_COLLECTION_PAGE_SIZE))
    }

    async fn find_by_member(
        &self,
        user_id: i32,
        viewer_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<Group>> {
        let tables = self.tables.read().await;
        let rows = tables.groups.rows.iter().filter(|g| {
            g.deleted_at.is_none()
                && tables.is_group_member(user_id, g.id)
                && tables.group_visible_to(g, viewer_id)
        });
        Ok(paginate(rows, options, DEFAULT_COLLECTION_PAGE_SIZE))
    }
}

#[async_trait]
impl GroupMemberRepository for InMemoryRepository {
    async fn delete(&self, user_id: i32, group_id: i32) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.group_members.rows.len();
        tables
            .group_members
            .rows
            .retain(|m| !(m.user_id == user_id && m.group_id == group_id));
        Ok(tables.group_members.rows.len() < before)
    }

    async fn find_by_user_and_group(
        &self,
        user_id: i32,
        group_id: i32,
    ) -> AppResult<Option<GroupMember>> {
        let tables = self.tables.read().await;
        Ok(tables
            .group_members
            .rows
            .iter()
            .find(|m| m.user_id == user_id && m.group_id == group_id)
            .cloned())
    }

    async fn find_all(&self, group_id: i32, options: &PageOptions) -> AppResult<Vec<GroupMember>> {
        let tables = self.tables.read().await;
        let rows = tables
            .group_members
            .rows
            .iter()
            .filter(|m| m.group_id == group_id);
        Ok(paginate(rows, options, DEFAULT_PAGE_SIZE))
    }
}

#[async_trait]
impl JoinRequestRepository for InMemoryRepository {
    async fn create(&self, user_id: i32, group_id: i32) -> AppResult<GroupJoinRequest> {
        let mut tables = self.tables.write().await;
        if tables
            .join_requests
            .rows
            .iter()
            .any(|r| r.user_id == user_id && r.group_id == group_id)
        {
            return Err(already_exists("Join request"));
        }

        let request = GroupJoinRequest {
            id: tables.join_requests.next_id(),
            group_id,
            user_id,
            created_at: Utc::now(),
        };
        tables.join_requests.rows.push(request.clone());
        Ok(request)
    }

    async fn delete(&self, user_id: i32, group_id: i32) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.join_requests.rows.len();
        tables
            .join_requests
            .rows
            .retain(|r| !(r.user_id == user_id && r.group_id == group_id));
        Ok(tables.join_requests.rows.len() < before)
    }

    async fn find_by_user_and_group(
        &self,
        user_id: i32,
        group_id: i32,
    ) -> AppResult<Option<GroupJoinRequest>> {
        let tables = self.tables.read().await;
        Ok(tables
            .join_requests
            .rows
            .iter()
            .find(|r| r.user_id == user_id && r.group_id == group_id)
            .cloned())
    }

    async fn find_all(
        &self,
        group_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<GroupJoinRequest>> {
        let tables = self.tables.read().await;
        let rows = tables
            .join_requests
            .rows
            .iter()
            .filter(|r| r.group_id == group_id);
        Ok(paginate(rows, options, DEFAULT_PAGE_SIZE))
    }

    async fn find_all_by_user(
        &self,
        user_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<GroupJoinRequest>> {
        let tables = self.tables.read().await;
        let rows = tables
            .join_requests
            .rows
            .iter()
            .filter(|r| r.user_id == user_id);
        Ok(paginate(rows, options, DEFAULT_PAGE_SIZE))
    }

    async fn accept(
        &self,
        user_id: i32,
        group_id: i32,
        accepted_by: i32,
    ) -> AppResult<GroupMember> {
        let mut tables = self.tables.write().await;
        if !tables
            .join_requests
            .rows
            .iter()
            .any(|r| r.user_id == user_id && r.group_id == group_id)
        {
            return Err(AppError::not_found("Join request not found"));
        }
        if tables.is_group_member(user_id, group_id) {
            return Err(already_exists("Group member"));
        }

        tables
            .join_requests
            .rows
            .retain(|r| !(r.user_id == user_id && r.group_id == group_id));
        let member = GroupMember {
            id: tables.group_members.next_id(),
            group_id,
            user_id,
            created_by_id: accepted_by,
            created_at: Utc::now(),
        };
        tables.group_members.rows.push(member.clone());
        Ok(member)
    }
}

// --- Lists ---

#[async_trait]
impl ListRepository for InMemoryRepository {
    async fn create(&self, list: NewList) -> AppResult<List> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let created = List {
            id: tables.lists.next_id(),
            creator_id: list.creator_id,
            name: list.name,
            description: list.description,
            is_private: list.is_private,
            created_at: now,
            updated_at: now,
        };
        tables.lists.rows.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, changes: ListChanges) -> AppResult<Option<List>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .lists
            .rows
            .iter_mut()
            .find(|l| l.id == id)
            .map(|list| {
                if let Some(name) = changes.name {
                    list.name = name;
                }
                if let Some(description) = changes.description {
                    list.description = Some(description);
                }
                if let Some(is_private) = changes.is_private {
                    list.is_private = is_private;
                }
                list.updated_at = Utc::now();
                list.clone()
            }))
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.lists.rows.len();
        tables.lists.rows.retain(|l| l.id != id);
        if tables.lists.rows.len() == before {
            return Ok(false);
        }
        tables.list_members.rows.retain(|m| m.list_id != id);
        tables.list_followers.rows.retain(|f| f.list_id != id);
        Ok(true)
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<List>> {
        let tables = self.tables.read().await;
        Ok(tables.lists.rows.iter().find(|l| l.id == id).cloned())
    }

    async fn find_visible(&self, requester_id: i32, options: &PageOptions) -> AppResult<Vec<List>> {
        let tables = self.tables.read().await;
        let rows = tables
            .lists
            .rows
            .iter()
            .filter(|l| !l.is_private || l.creator_id == requester_id);
        Ok(paginate(rows, options, DEFAULT_COLLECTION_PAGE_SIZE))
    }

    async fn find_by_creator(
        &self,
        creator_id: i32,
        viewer_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<List>> {
        let tables = self.tables.read().await;
        let rows = tables.lists.rows.iter().filter(|l| {
            l.creator_id == creator_id && (!l.is_private || l.creator_id == viewer_id)
        });
        Ok(paginate(rows, options, DEFAULT_COLLECTION_PAGE_SIZE))
    }
}

#[async_trait]
impl ListMemberRepository for InMemoryRepository {
    async fn create(&self, user_id: i32, list_id: i32) -> AppResult<ListMember> {
        let mut tables = self.tables.write().await;
        if tables
            .list_members
            .rows
            .iter()
            .any(|m| m.user_id == user_id && m.list_id == list_id)
        {
            return Err(already_exists("List member"));
        }

        let member = ListMember {
            id: tables.list_members.next_id(),
            list_id,
            user_id,
            created_at: Utc::now(),
        };
        tables.list_members.rows.push(member.clone());
        Ok(member)
    }

    async fn delete(&self, user_id: i32, list_id: i32) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.list_members.rows.len();
        tables
            .list_members
            .rows
            .retain(|m| !(m.user_id == user_id && m.list_id == list_id));
        Ok(tables.list_members.rows.len() < before)
    }

    async fn find_by_user_and_list(
        &self,
        user_id: i32,
        list_id: i32,
    ) -> AppResult<Option<ListMember>> {
        let tables = self.tables.read().await;
        Ok(tables
            .list_members
            .rows
            .iter()
            .find(|m| m.user_id == user_id && m.list_id == list_id)
            .cloned())
    }

    async fn find_all(&self, list_id: i32, options: &PageOptions) -> AppResult<Vec<ListMember>> {
        let tables = self.tables.read().await;
        let rows = tables.list_members.rows.iter().filter(|m| m.list_id == list_id);
        Ok(paginate(rows, options, DEFAULT_PAGE_SIZE))
    }
}

#[async_trait]
impl ListFollowerRepository for InMemoryRepository {
    async fn create(&self, user_id: i32, list_id: i32) -> AppResult<ListFollower> {
        let mut tables = self.tables.write().await;
        if tables
            .list_followers
            .rows
            .iter()
            .any(|f| f.user_id == user_id && f.list_id == list_id)
        {
            return Err(already_exists("List follower"));
        }

        let follower = ListFollower {
            id: tables.list_followers.next_id(),
            list_id,
            user_id,
            created_at: Utc::now(),
        };
        tables.list_followers.rows.push(follower.clone());
        Ok(follower)
    }

    async fn delete(&self, user_id: i32, list_id: i32) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.list_followers.rows.len();
        tables
            .list_followers
            .rows
            .retain(|f| !(f.user_id == user_id && f.list_id == list_id));
        Ok(tables.list_followers.rows.len() < before)
    }

    async fn find_by_user_and_list(
        &self,
        user_id: i32,
        list_id: i32,
    ) -> AppResult<Option<ListFollower>> {
        let tables = self.tables.read().await;
        Ok(tables
            .list_followers
            .rows
            .iter()
            .find(|f| f.user_id == user_id && f.list_id == list_id)
            .cloned())
    }

    async fn find_all(&self, list_id: i32, options: &PageOptions) -> AppResult<Vec<ListFollower>> {
        let tables = self.tables.read().await;
        let rows = tables
            .list_followers
            .rows
            .iter()
            .filter(|f| f.list_id == list_id);
        Ok(paginate(rows, options, DEFAULT_PAGE_SIZE))
    }
}
