use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{Bookmark, Post};
use crate::repository::{
    BookmarkRepository, GroupMemberRepository, GroupRepository, PageOptions, PostRepository,
};
use crate::services::post::{PostAccess, resolve_posts};
use crate::services::validation::validate_ids;

pub struct BookmarkService {
    bookmarks: Arc<dyn BookmarkRepository>,
    posts: Arc<dyn PostRepository>,
    access: PostAccess,
}

impl BookmarkService {
    pub fn new(
        bookmarks: Arc<dyn BookmarkRepository>,
        posts: Arc<dyn PostRepository>,
        groups: Arc<dyn GroupRepository>,
        members: Arc<dyn GroupMemberRepository>,
    ) -> Self {
        Self {
            bookmarks,
            posts,
            access: PostAccess::new(groups, members),
        }
    }

    /// Only posts the user can read may be bookmarked.
    pub async fn create(&self, post_id: i32, user_id: i32) -> AppResult<Bookmark> {
        validate_ids(&[post_id, user_id])?;

        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post not found"))?;
        self.access.ensure_can_read(&post, user_id).await?;

        if self
            .bookmarks
            .find_by_user_and_post(user_id, post_id)
            .await?
            .is_some()
        {
            return Err(AppError::bad_request("Bookmark already exists"));
        }

        self.bookmarks.create(user_id, post_id).await
    }

    pub async fn delete(&self, post_id: i32, user_id: i32) -> AppResult<()> {
        validate_ids(&[post_id, user_id])?;

        if !self.bookmarks.delete(user_id, post_id).await? {
            return Err(AppError::not_found("Bookmark not found"));
        }
        Ok(())
    }

    /// find_bookmarked_by_user
    ///
    /// One page of bookmarks resolved to their posts with a single batched
    /// lookup, in bookmark order. Posts of private groups the user has left
    /// are skipped.
    pub async fn find_bookmarked_by_user(
        &self,
        user_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<Post>> {
        validate_ids(&[user_id])?;
        let bookmarks = self.bookmarks.find_all_of_user(user_id, options).await?;
        let posts = resolve_posts(
            self.posts.as_ref(),
            bookmarks.into_iter().map(|b| b.post_id).collect(),
        )
        .await?;
        self.access.retain_readable(posts, user_id).await
    }
}
