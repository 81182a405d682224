use std::sync::Arc;

use crate::auth::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::models::{
    NewUser, OwnerUserView, PublicUserView, RegisterUserRequest, UpdatePasswordRequest,
    UpdateUserRequest, User, UserChanges, UserView,
};
use crate::repository::{FollowRepository, PageOptions, UserRepository};
use crate::services::validation::{
    validate_email, validate_id, validate_ids, validate_password, validate_user_tag,
};

/// UserService
///
/// Registration, profile management and the follow graph.
pub struct UserService {
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        follows: Arc<dyn FollowRepository>,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            users,
            follows,
            bcrypt_cost,
        }
    }

    async fn check_user_tag(&self, user_tag: &str) -> AppResult<()> {
        validate_user_tag(user_tag)?;
        if self.users.find_by_user_tag(user_tag).await?.is_some() {
            return Err(AppError::bad_request("User with tag already exists"));
        }
        Ok(())
    }

    async fn check_email(&self, email: &str) -> AppResult<()> {
        validate_email(email)?;
        if self.users.find_by_email(email).await?.is_some() {
            return Err(AppError::bad_request("User with email already exists"));
        }
        Ok(())
    }

    async fn existing(&self, user_id: i32) -> AppResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    fn ensure_owner(user_id: i32, requester_id: i32) -> AppResult<()> {
        if user_id != requester_id {
            return Err(AppError::forbidden("You can only modify your own account"));
        }
        Ok(())
    }

    /// create
    ///
    /// Registers a user. The password is stored as a salted bcrypt hash.
    pub async fn create(&self, data: RegisterUserRequest) -> AppResult<OwnerUserView> {
        self.check_user_tag(&data.user_tag).await?;
        self.check_email(&data.email).await?;
        validate_password(&data.password)?;

        let password_hash = hash_password(&data.password, self.bcrypt_cost).await?;
        let user = self
            .users
            .create(NewUser {
                email: data.email,
                user_tag: data.user_tag,
                password_hash,
                user_name: data.user_name,
                biography: data.biography,
            })
            .await?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user.into())
    }

    /// update
    ///
    /// Owner-only partial update. Email and tag are re-validated only when
    /// they actually change.
    pub async fn update(
        &self,
        user_id: i32,
        data: UpdateUserRequest,
        requester_id: i32,
    ) -> AppResult<OwnerUserView> {
        validate_ids(&[user_id, requester_id])?;
        let current = self.existing(user_id).await?;
        Self::ensure_owner(user_id, requester_id)?;

        let email = data.email.filter(|email| *email != current.email);
        if let Some(email) = &email {
            self.check_email(email).await?;
        }
        let user_tag = data.user_tag.filter(|tag| *tag != current.user_tag);
        if let Some(user_tag) = &user_tag {
            self.check_user_tag(user_tag).await?;
        }

        let changes = UserChanges {
            email,
            user_tag,
            user_name: data.user_name,
            biography: data.biography,
            avatar: data.avatar,
            password_hash: None,
        };

        self.users
            .update(user_id, changes)
            .await?
            .map(OwnerUserView::from)
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    /// update_password
    ///
    /// Requires the current password. Also revokes every refresh token.
    pub async fn update_password(
        &self,
        user_id: i32,
        data: UpdatePasswordRequest,
        requester_id: i32,
    ) -> AppResult<()> {
        validate_ids(&[user_id, requester_id])?;
        let current = self.existing(user_id).await?;
        Self::ensure_owner(user_id, requester_id)?;
        validate_password(&data.new_password)?;

        if !verify_password(&data.old_password, &current.password).await? {
            return Err(AppError::bad_request("Old password is incorrect"));
        }

        let password_hash = hash_password(&data.new_password, self.bcrypt_cost).await?;
        self.users
            .update(
                user_id,
                UserChanges {
                    password_hash: Some(password_hash),
                    ..UserChanges::default()
                },
            )
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    pub async fn delete(&self, user_id: i32, requester_id: i32) -> AppResult<()> {
        validate_ids(&[user_id, requester_id])?;
        self.existing(user_id).await?;
        Self::ensure_owner(user_id, requester_id)?;

        self.users.delete(user_id).await?;
        tracing::info!(user_id, "User deleted");
        Ok(())
    }

    pub async fn find_by_id(&self, user_id: i32, requester_id: i32) -> AppResult<UserView> {
        validate_ids(&[user_id, requester_id])?;
        let user = self.existing(user_id).await?;
        Ok(UserView::for_viewer(user, requester_id))
    }

    pub async fn find_by_tag(&self, user_tag: &str, requester_id: i32) -> AppResult<UserView> {
        validate_id(requester_id)?;
        let user = self
            .users
            .find_by_user_tag(user_tag)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        Ok(UserView::for_viewer(user, requester_id))
    }

    pub async fn find_all(&self, options: &PageOptions) -> AppResult<Vec<PublicUserView>> {
        let users = self.users.find_all(options).await?;
        Ok(users.into_iter().map(PublicUserView::from).collect())
    }

    /// Public views of `ids`, in the order of `ids`.
    pub(crate) async fn public_views(&self, ids: Vec<i32>) -> AppResult<Vec<PublicUserView>> {
        resolve_users(self.users.as_ref(), ids).await
    }

    /// follow
    ///
    /// `requester_id` starts following `user_id`. Following twice is rejected.
    pub async fn follow(&self, user_id: i32, requester_id: i32) -> AppResult<()> {
        validate_ids(&[user_id, requester_id])?;
        if user_id == requester_id {
            return Err(AppError::bad_request("You cannot follow yourself"));
        }
        self.existing(user_id).await?;
        self.existing(requester_id).await?;

        if self.follows.find_by_pair(requester_id, user_id).await?.is_some() {
            return Err(AppError::bad_request("You already follow this user"));
        }

        self.follows.create(requester_id, user_id).await?;
        tracing::info!(follower_id = requester_id, following_id = user_id, "Follow created");
        Ok(())
    }

    pub async fn unfollow(&self, user_id: i32, requester_id: i32) -> AppResult<()> {
        validate_ids(&[user_id, requester_id])?;
        if user_id == requester_id {
            return Err(AppError::bad_request("You cannot unfollow yourself"));
        }

        if !self.follows.delete(requester_id, user_id).await? {
            return Err(AppError::bad_request("You do not follow this user"));
        }
        Ok(())
    }

    /// remove_follower
    ///
    /// `user_id` drops `follower_id` from their followers.
    pub async fn remove_follower(
        &self,
        user_id: i32,
        follower_id: i32,
        requester_id: i32,
    ) -> AppResult<()> {
        validate_ids(&[user_id, follower_id, requester_id])?;
        Self::ensure_owner(user_id, requester_id)?;
        if user_id == follower_id {
            return Err(AppError::bad_request("You cannot remove yourself as a follower"));
        }

        if !self.follows.delete(follower_id, user_id).await? {
            return Err(AppError::not_found("Follower not found"));
        }
        Ok(())
    }

    pub async fn find_followers(
        &self,
        user_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<PublicUserView>> {
        validate_id(user_id)?;
        self.existing(user_id).await?;
        let follows = self.follows.find_followers(user_id, options).await?;
        self.public_views(follows.into_iter().map(|f| f.follower_id).collect())
            .await
    }

    pub async fn find_following(
        &self,
        user_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<PublicUserView>> {
        validate_id(user_id)?;
        self.existing(user_id).await?;
        let follows = self.follows.find_following(user_id, options).await?;
        self.public_views(follows.into_iter().map(|f| f.following_id).collect())
            .await
    }
}

/// Batched lookup of `ids` that keeps the caller's order. Ids of deleted
/// users are skipped.
pub(crate) async fn resolve_users(
    users: &dyn UserRepository,
    ids: Vec<i32>,
) -> AppResult<Vec<PublicUserView>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let found = users.find_all(&PageOptions::for_ids(ids.clone())).await?;
    Ok(ids
        .iter()
        .filter_map(|id| found.iter().find(|u| u.id == *id))
        .cloned()
        .map(PublicUserView::from)
        .collect())
}
