use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{
    CreateListRequest, List, ListChanges, ListFollower, ListMember, NewList, PublicUserView,
    UpdateListRequest,
};
use crate::repository::{
    ListFollowerRepository, ListMemberRepository, ListRepository, PageOptions, UserRepository,
};
use crate::services::user::resolve_users;
use crate::services::validation::{validate_description, validate_id, validate_ids, validate_name};

/// ListService
///
/// Curated user lists. Only the creator edits a list or its members; a
/// private list is invisible to everyone else.
pub struct ListService {
    lists: Arc<dyn ListRepository>,
    members: Arc<dyn ListMemberRepository>,
    followers: Arc<dyn ListFollowerRepository>,
    users: Arc<dyn UserRepository>,
}

impl ListService {
    pub fn new(
        lists: Arc<dyn ListRepository>,
        members: Arc<dyn ListMemberRepository>,
        followers: Arc<dyn ListFollowerRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            lists,
            members,
            followers,
            users,
        }
    }

    async fn existing(&self, list_id: i32) -> AppResult<List> {
        self.lists
            .find_by_id(list_id)
            .await?
            .ok_or_else(|| AppError::not_found("List not found"))
    }

    /// Fetches the list and checks that `requester_id` created it.
    async fn owned(&self, list_id: i32, requester_id: i32) -> AppResult<List> {
        let list = self.existing(list_id).await?;
        if list.creator_id != requester_id {
            return Err(AppError::forbidden("Only the creator can modify this list"));
        }
        Ok(list)
    }

    /// Fetches the list and checks that `requester_id` may see it.
    async fn visible(&self, list_id: i32, requester_id: i32) -> AppResult<List> {
        let list = self.existing(list_id).await?;
        if list.is_private && list.creator_id != requester_id {
            return Err(AppError::forbidden("This list is private"));
        }
        Ok(list)
    }

    pub async fn create(&self, creator_id: i32, data: CreateListRequest) -> AppResult<List> {
        validate_id(creator_id)?;
        validate_name(&data.name)?;
        validate_description(data.description.as_deref())?;

        let list = self
            .lists
            .create(NewList {
                name: data.name,
                description: data.description,
                is_private: data.is_private.unwrap_or(false),
                creator_id,
            })
            .await?;

        tracing::info!(list_id = list.id, creator_id, "List created");
        Ok(list)
    }

    pub async fn update(
        &self,
        list_id: i32,
        data: UpdateListRequest,
        requester_id: i32,
    ) -> AppResult<List> {
        validate_ids(&[list_id, requester_id])?;
        self.owned(list_id, requester_id).await?;
        if let Some(name) = &data.name {
            validate_name(name)?;
        }
        validate_description(data.description.as_deref())?;

        self.lists
            .update(
                list_id,
                ListChanges {
                    name: data.name,
                    description: data.description,
                    is_private: data.is_private,
                },
            )
            .await?
            .ok_or_else(|| AppError::not_found("List not found"))
    }

    /// Removes the list along with its members and followers.
    pub async fn delete(&self, list_id: i32, requester_id: i32) -> AppResult<()> {
        validate_ids(&[list_id, requester_id])?;
        self.owned(list_id, requester_id).await?;

        self.lists.delete(list_id).await?;
        tracing::info!(list_id, "List deleted");
        Ok(())
    }

    pub async fn find_by_id(&self, list_id: i32, requester_id: i32) -> AppResult<List> {
        validate_ids(&[list_id, requester_id])?;
        self.visible(list_id, requester_id).await
    }

    /// All lists the requester may see: public ones and their own.
    pub async fn find_all(&self, requester_id: i32, options: &PageOptions) -> AppResult<Vec<List>> {
        validate_id(requester_id)?;
        self.lists.find_visible(requester_id, options).await
    }

    pub async fn find_lists_of_user(
        &self,
        user_id: i32,
        requester_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<List>> {
        validate_ids(&[user_id, requester_id])?;
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::not_found("User not found"));
        }
        self.lists.find_by_creator(user_id, requester_id, options).await
    }

    pub async fn find_members(
        &self,
        list_id: i32,
        requester_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<PublicUserView>> {
        validate_ids(&[list_id, requester_id])?;
        self.visible(list_id, requester_id).await?;
        let members = self.members.find_all(list_id, options).await?;
        resolve_users(
            self.users.as_ref(),
            members.into_iter().map(|m| m.user_id).collect(),
        )
        .await
    }

    pub async fn find_followers(
        &self,
        list_id: i32,
        requester_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<PublicUserView>> {
        validate_ids(&[list_id, requester_id])?;
        self.visible(list_id, requester_id).await?;
        let followers = self.followers.find_all(list_id, options).await?;
        resolve_users(
            self.users.as_ref(),
            followers.into_iter().map(|f| f.user_id).collect(),
        )
        .await
    }

    pub async fn add_member(
        &self,
        list_id: i32,
        user_id: i32,
        requester_id: i32,
    ) -> AppResult<ListMember> {
        validate_ids(&[list_id, user_id, requester_id])?;
        self.owned(list_id, requester_id).await?;
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::not_found("User not found"));
        }
        if self
            .members
            .find_by_user_and_list(user_id, list_id)
            .await?
            .is_some()
        {
            return Err(AppError::bad_request("User is already a member of this list"));
        }

        self.members.create(user_id, list_id).await
    }

    pub async fn remove_member(
        &self,
        list_id: i32,
        user_id: i32,
        requester_id: i32,
    ) -> AppResult<()> {
        validate_ids(&[list_id, user_id, requester_id])?;
        self.owned(list_id, requester_id).await?;

        if !self.members.delete(user_id, list_id).await? {
            return Err(AppError::not_found("List member not found"));
        }
        Ok(())
    }

    /// follow_list
    ///
    /// Private lists cannot be followed by anyone but their creator.
    pub async fn follow_list(&self, list_id: i32, user_id: i32) -> AppResult<ListFollower> {
        validate_ids(&[list_id, user_id])?;
        self.visible(list_id, user_id).await?;
        if self
            .followers
            .find_by_user_and_list(user_id, list_id)
            .await?
            .is_some()
        {
            return Err(AppError::bad_request("You already follow this list"));
        }

        self.followers.create(user_id, list_id).await
    }

    /// unfollow_list
    ///
    /// The follower leaves, or the creator removes them.
    pub async fn unfollow_list(
        &self,
        list_id: i32,
        user_id: i32,
        requester_id: i32,
    ) -> AppResult<()> {
        validate_ids(&[list_id, user_id, requester_id])?;
        let list = self.existing(list_id).await?;
        if requester_id != user_id && requester_id != list.creator_id {
            return Err(AppError::forbidden(
                "Only the follower or the list creator can remove a follow",
            ));
        }

        if !self.followers.delete(user_id, list_id).await? {
            return Err(AppError::not_found("List follow not found"));
        }
        Ok(())
    }
}
