use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{CreatePostRequest, NewPost, Post, PublicUserView};
use crate::repository::{
    GroupMemberRepository, GroupRepository, LikeRepository, PageOptions, PostRepository,
    UserRepository,
};
use crate::services::user::resolve_users;
use crate::services::validation::{validate_id, validate_ids, validate_post_content};

/// PostAccess
///
/// The private-group read gate. Every service that hands out posts goes
/// through it, so group posts never leak through a side listing.
pub(crate) struct PostAccess {
    groups: Arc<dyn GroupRepository>,
    members: Arc<dyn GroupMemberRepository>,
}

impl PostAccess {
    pub(crate) fn new(
        groups: Arc<dyn GroupRepository>,
        members: Arc<dyn GroupMemberRepository>,
    ) -> Self {
        Self { groups, members }
    }

    pub(crate) async fn ensure_can_read(&self, post: &Post, requester_id: i32) -> AppResult<()> {
        let Some(group_id) = post.group_id else {
            return Ok(());
        };
        let Some(group) = self.groups.find_by_id(group_id).await? else {
            return Err(AppError::not_found("Post not found"));
        };
        if group.is_private
            && self
                .members
                .find_by_user_and_group(requester_id, group_id)
                .await?
                .is_none()
        {
            return Err(AppError::forbidden(
                "You need to be a member of the group to see this post",
            ));
        }
        Ok(())
    }

    /// Drops the posts `requester_id` may not read, keeping the order.
    pub(crate) async fn retain_readable(
        &self,
        posts: Vec<Post>,
        requester_id: i32,
    ) -> AppResult<Vec<Post>> {
        let mut readable = Vec::with_capacity(posts.len());
        for post in posts {
            match self.ensure_can_read(&post, requester_id).await {
                Ok(()) => readable.push(post),
                Err(AppError::Forbidden(_) | AppError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(readable)
    }
}

/// PostService
///
/// Posts, replies, reposts and likes. Posts inside a private group are only
/// readable by the group's members.
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    likes: Arc<dyn LikeRepository>,
    groups: Arc<dyn GroupRepository>,
    members: Arc<dyn GroupMemberRepository>,
    access: PostAccess,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        likes: Arc<dyn LikeRepository>,
        groups: Arc<dyn GroupRepository>,
        members: Arc<dyn GroupMemberRepository>,
    ) -> Self {
        let access = PostAccess::new(groups.clone(), members.clone());
        Self {
            posts,
            users,
            likes,
            groups,
            members,
            access,
        }
    }

    async fn existing(&self, post_id: i32, missing: &str) -> AppResult<Post> {
        self.posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| AppError::not_found(missing))
    }

    /// create
    ///
    /// A repost must name its original; `is_repost` defaults to whether one
    /// was given. A reply lives in exactly the group of its parent, or in
    /// none when the parent is outside of groups.
    pub async fn create(&self, author_id: i32, data: CreatePostRequest) -> AppResult<Post> {
        validate_id(author_id)?;
        validate_post_content(&data.content)?;

        if self.users.find_by_id(author_id).await?.is_none() {
            return Err(AppError::not_found("User not found"));
        }

        let is_repost = data.is_repost.unwrap_or(data.original_post_id.is_some());
        if is_repost && data.original_post_id.is_none() {
            return Err(AppError::bad_request(
                "A repost has to have the original post id",
            ));
        }

        let mut group_id = data.group_id;
        if let Some(parent_id) = data.parent_post_id {
            validate_id(parent_id)?;
            let parent = self.existing(parent_id, "Parent post not found").await?;
            self.access.ensure_can_read(&parent, author_id).await?;
            match group_id {
                None => group_id = parent.group_id,
                Some(own) if Some(own) != parent.group_id => {
                    return Err(AppError::bad_request(
                        "A reply has to be posted in the group of its parent",
                    ));
                }
                Some(_) => {}
            }
        }
        if let Some(original_id) = data.original_post_id {
            validate_id(original_id)?;
            let original = self.existing(original_id, "Original post not found").await?;
            self.access.ensure_can_read(&original, author_id).await?;
        }

        if let Some(group_id) = group_id {
            validate_id(group_id)?;
            if self.groups.find_by_id(group_id).await?.is_none() {
                return Err(AppError::not_found("Group not found"));
            }
            if self
                .members
                .find_by_user_and_group(author_id, group_id)
                .await?
                .is_none()
            {
                return Err(AppError::forbidden(
                    "You need to be a member of the group to post in it",
                ));
            }
        }

        let post = self
            .posts
            .create(NewPost {
                content: data.content,
                author_id,
                parent_post_id: data.parent_post_id,
                original_post_id: data.original_post_id,
                is_repost,
                group_id,
            })
            .await?;

        tracing::info!(post_id = post.id, author_id, "Post created");
        Ok(post)
    }

    pub async fn update(&self, post_id: i32, content: String, requester_id: i32) -> AppResult<Post> {
        validate_ids(&[post_id, requester_id])?;
        validate_post_content(&content)?;
        let post = self.existing(post_id, "Post not found").await?;
        if post.author_id != requester_id {
            return Err(AppError::forbidden("You can only edit your own posts"));
        }

        self.posts
            .update(post_id, content)
            .await?
            .ok_or_else(|| AppError::not_found("Post not found"))
    }

    pub async fn delete(&self, post_id: i32, requester_id: i32) -> AppResult<()> {
        validate_ids(&[post_id, requester_id])?;
        let post = self.existing(post_id, "Post not found").await?;
        if post.author_id != requester_id {
            return Err(AppError::forbidden("You can only delete your own posts"));
        }

        self.posts.delete(post_id).await?;
        tracing::info!(post_id, "Post deleted");
        Ok(())
    }

    /// Owner-only bulk removal; returns how many posts were removed.
    pub async fn delete_all_of_user(&self, user_id: i32, requester_id: i32) -> AppResult<u64> {
        validate_ids(&[user_id, requester_id])?;
        if user_id != requester_id {
            return Err(AppError::forbidden("You can only delete your own posts"));
        }

        let removed = self.posts.delete_all_of_user(user_id).await?;
        tracing::info!(user_id, removed, "Posts of user deleted");
        Ok(removed)
    }

    pub async fn find_by_id(&self, post_id: i32, requester_id: i32) -> AppResult<Post> {
        validate_ids(&[post_id, requester_id])?;
        let post = self.existing(post_id, "Post not found").await?;
        self.access.ensure_can_read(&post, requester_id).await?;
        Ok(post)
    }

    /// The timeline: every live post outside of groups.
    pub async fn find_all(&self, options: &PageOptions) -> AppResult<Vec<Post>> {
        self.posts.find_all(options).await
    }

    /// Replies (comments) of a post.
    pub async fn find_children_of_post(
        &self,
        post_id: i32,
        requester_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<Post>> {
        self.find_by_id(post_id, requester_id).await?;
        let children = self.posts.find_children_of_post(post_id, options).await?;
        self.access.retain_readable(children, requester_id).await
    }

    pub async fn find_parent_post(&self, post_id: i32, requester_id: i32) -> AppResult<Post> {
        let post = self.find_by_id(post_id, requester_id).await?;
        let parent_id = post
            .parent_post_id
            .ok_or_else(|| AppError::not_found("Post has no parent post"))?;
        self.find_by_id(parent_id, requester_id).await
    }

    pub async fn find_posts_of_user(
        &self,
        user_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<Post>> {
        validate_id(user_id)?;
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::not_found("User not found"));
        }
        self.posts.find_all_of_user(user_id, options).await
    }

    pub async fn create_like(&self, post_id: i32, user_id: i32) -> AppResult<()> {
        self.find_by_id(post_id, user_id).await?;

        if self
            .likes
            .find_by_user_and_post(user_id, post_id)
            .await?
            .is_some()
        {
            return Err(AppError::bad_request("Like already exists"));
        }

        self.likes.create(user_id, post_id).await?;
        Ok(())
    }

    pub async fn delete_like(&self, post_id: i32, user_id: i32) -> AppResult<()> {
        validate_ids(&[post_id, user_id])?;

        if self
            .likes
            .find_by_user_and_post(user_id, post_id)
            .await?
            .is_none()
        {
            return Err(AppError::not_found("Like not found"));
        }

        if !self.likes.delete(user_id, post_id).await? {
            return Err(AppError::not_found("Like not found"));
        }
        Ok(())
    }

    /// Users who liked the post, most recent like first by default.
    pub async fn find_likes_of_post(
        &self,
        post_id: i32,
        requester_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<PublicUserView>> {
        self.find_by_id(post_id, requester_id).await?;
        let likes = self.likes.find_all_of_post(post_id, options).await?;
        resolve_users(
            self.users.as_ref(),
            likes.into_iter().map(|like| like.user_id).collect(),
        )
        .await
    }

    /// Posts a user liked, in like order. Group posts are left out.
    pub async fn find_liked_by_user(
        &self,
        user_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<Post>> {
        validate_id(user_id)?;
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::not_found("User not found"));
        }

        let likes = self.likes.find_all_of_user(user_id, options).await?;
        let posts = resolve_posts(
            self.posts.as_ref(),
            likes.into_iter().map(|like| like.post_id).collect(),
        )
        .await?;
        Ok(posts.into_iter().filter(|p| p.group_id.is_none()).collect())
    }
}

/// Batched lookup of `ids` in one gateway call, keeping the caller's order.
/// Deleted posts are skipped.
pub(crate) async fn resolve_posts(posts: &dyn PostRepository, ids: Vec<i32>) -> AppResult<Vec<Post>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let found = posts.find_all(&PageOptions::for_ids(ids.clone())).await?;
    Ok(ids
        .iter()
        .filter_map(|id| found.iter().find(|p| p.id == *id))
        .cloned()
        .collect())
}
