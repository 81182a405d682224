use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{
    CreateGroupRequest, Group, GroupChanges, GroupJoinRequest, GroupMember, NewGroup, Post,
    PublicUserView, UpdateGroupRequest,
};
use crate::repository::{
    GroupMemberRepository, GroupRepository, JoinRequestRepository, PageOptions, PostRepository,
    UserRepository,
};
use crate::services::user::resolve_users;
use crate::services::validation::{validate_description, validate_id, validate_ids, validate_name};

/// GroupService
///
/// Groups and the per-(user, group) membership lifecycle:
///
/// ```text
/// non-member --create_join_request--> pending
/// pending    --accept (creator)-----> member
/// pending    --reject (creator)-----> non-member
/// member     --remove_member--------> non-member   (creator or self, never the creator)
/// ```
///
/// The creator becomes a member when the group is created. Every entry point
/// re-fetches the group and checks its own authorization.
pub struct GroupService {
    groups: Arc<dyn GroupRepository>,
    members: Arc<dyn GroupMemberRepository>,
    join_requests: Arc<dyn JoinRequestRepository>,
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
}

impl GroupService {
    pub fn new(
        groups: Arc<dyn GroupRepository>,
        members: Arc<dyn GroupMemberRepository>,
        join_requests: Arc<dyn JoinRequestRepository>,
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            groups,
            members,
            join_requests,
            posts,
            users,
        }
    }

    async fn existing(&self, group_id: i32) -> AppResult<Group> {
        self.groups
            .find_by_id(group_id)
            .await?
            .ok_or_else(|| AppError::not_found("Group not found"))
    }

    async fn is_member(&self, user_id: i32, group_id: i32) -> AppResult<bool> {
        Ok(self
            .members
            .find_by_user_and_group(user_id, group_id)
            .await?
            .is_some())
    }

    /// Fetches the group and checks that `requester_id` created it.
    async fn owned(&self, group_id: i32, requester_id: i32) -> AppResult<Group> {
        let group = self.existing(group_id).await?;
        if group.creator_id != requester_id {
            return Err(AppError::forbidden(
                "Only the creator of the group can do this",
            ));
        }
        Ok(group)
    }

    /// Fetches the group and checks that `requester_id` may see its content.
    async fn readable(&self, group_id: i32, requester_id: i32) -> AppResult<Group> {
        let group = self.existing(group_id).await?;
        if group.is_private && !self.is_member(requester_id, group_id).await? {
            return Err(AppError::forbidden(
                "You need to be a member of this private group",
            ));
        }
        Ok(group)
    }

    /// create
    ///
    /// The group and the creator's membership are written together.
    pub async fn create(&self, creator_id: i32, data: CreateGroupRequest) -> AppResult<Group> {
        validate_id(creator_id)?;
        validate_name(&data.name)?;
        validate_description(data.description.as_deref())?;
        if self.users.find_by_id(creator_id).await?.is_none() {
            return Err(AppError::not_found("User not found"));
        }

        let group = self
            .groups
            .create(NewGroup {
                name: data.name,
                description: data.description,
                is_private: data.is_private.unwrap_or(false),
                creator_id,
            })
            .await?;

        tracing::info!(group_id = group.id, creator_id, "Group created");
        Ok(group)
    }

    pub async fn update(
        &self,
        group_id: i32,
        data: UpdateGroupRequest,
        requester_id: i32,
    ) -> AppResult<Group> {
        validate_ids(&[group_id, requester_id])?;
        self.owned(group_id, requester_id).await?;
        if let Some(name) = &data.name {
            validate_name(name)?;
        }
        validate_description(data.description.as_deref())?;

        self.groups
            .update(
                group_id,
                GroupChanges {
                    name: data.name,
                    description: data.description,
                    is_private: data.is_private,
                },
            )
            .await?
            .ok_or_else(|| AppError::not_found("Group not found"))
    }

    /// delete
    ///
    /// Members, join requests and posts go first, then the group itself, in a
    /// single gateway transaction.
    pub async fn delete(&self, group_id: i32, requester_id: i32) -> AppResult<()> {
        validate_ids(&[group_id, requester_id])?;
        self.owned(group_id, requester_id).await?;

        if !self.groups.delete(group_id).await? {
            return Err(AppError::not_found("Group not found"));
        }
        tracing::info!(group_id, "Group deleted");
        Ok(())
    }

    pub async fn delete_all_posts(&self, group_id: i32, requester_id: i32) -> AppResult<u64> {
        validate_ids(&[group_id, requester_id])?;
        self.owned(group_id, requester_id).await?;

        let removed = self.posts.delete_all_of_group(group_id).await?;
        tracing::info!(group_id, removed, "Group posts deleted");
        Ok(removed)
    }

    pub async fn find_by_id(&self, group_id: i32, requester_id: i32) -> AppResult<Group> {
        validate_ids(&[group_id, requester_id])?;
        self.readable(group_id, requester_id).await
    }

    /// Public groups plus the private groups the requester belongs to.
    pub async fn find_all(&self, requester_id: i32, options: &PageOptions) -> AppResult<Vec<Group>> {
        validate_id(requester_id)?;
        self.groups.find_visible(requester_id, options).await
    }

    pub async fn find_members(
        &self,
        group_id: i32,
        requester_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<PublicUserView>> {
        validate_ids(&[group_id, requester_id])?;
        self.readable(group_id, requester_id).await?;
        let members = self.members.find_all(group_id, options).await?;
        resolve_users(
            self.users.as_ref(),
            members.into_iter().map(|m| m.user_id).collect(),
        )
        .await
    }

    pub async fn find_posts(
        &self,
        group_id: i32,
        requester_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<Post>> {
        validate_ids(&[group_id, requester_id])?;
        self.readable(group_id, requester_id).await?;
        self.posts.find_all_of_group(group_id, options).await
    }

    pub async fn find_groups_of_user(
        &self,
        user_id: i32,
        requester_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<Group>> {
        validate_ids(&[user_id, requester_id])?;
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::not_found("User not found"));
        }
        self.groups.find_by_member(user_id, requester_id, options).await
    }

    /// A user's own pending requests.
    pub async fn find_join_requests_of_user(
        &self,
        user_id: i32,
        requester_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<GroupJoinRequest>> {
        validate_ids(&[user_id, requester_id])?;
        if user_id != requester_id {
            return Err(AppError::forbidden(
                "You can only see your own join requests",
            ));
        }
        self.join_requests.find_all_by_user(user_id, options).await
    }

    /// Pending requests of a group, for its creator.
    /// The users waiting to join, in request order.
    pub async fn find_join_requests(
        &self,
        group_id: i32,
        requester_id: i32,
        options: &PageOptions,
    ) -> AppResult<Vec<PublicUserView>> {
        validate_ids(&[group_id, requester_id])?;
        self.owned(group_id, requester_id).await?;
        let requests = self.join_requests.find_all(group_id, options).await?;
        resolve_users(
            self.users.as_ref(),
            requests.into_iter().map(|r| r.user_id).collect(),
        )
        .await
    }

    /// remove_member
    ///
    /// The creator removes a member, or a member leaves. The creator can
    /// never be removed; they delete the group instead.
    pub async fn remove_member(
        &self,
        group_id: i32,
        user_id: i32,
        requester_id: i32,
    ) -> AppResult<()> {
        validate_ids(&[group_id, user_id, requester_id])?;
        let group = self.existing(group_id).await?;

        if requester_id != group.creator_id && requester_id != user_id {
            return Err(AppError::forbidden(
                "Only the creator of the group or the member can do this",
            ));
        }
        if user_id == group.creator_id {
            return Err(AppError::forbidden(
                "As owner you need to delete the group to leave it",
            ));
        }

        if !self.members.delete(user_id, group_id).await? {
            return Err(AppError::not_found("Member not found"));
        }
        tracing::info!(group_id, user_id, removed_by = requester_id, "Group member removed");
        Ok(())
    }

    pub async fn create_join_request(
        &self,
        group_id: i32,
        user_id: i32,
    ) -> AppResult<GroupJoinRequest> {
        validate_ids(&[group_id, user_id])?;
        self.existing(group_id).await?;

        if self.is_member(user_id, group_id).await? {
            return Err(AppError::bad_request("You are already a member of this group"));
        }
        if self
            .join_requests
            .find_by_user_and_group(user_id, group_id)
            .await?
            .is_some()
        {
            return Err(AppError::bad_request("Join request already exists"));
        }

        self.join_requests.create(user_id, group_id).await
    }

    /// Withdrawal of a pending request by the user who sent it.
    pub async fn delete_join_request(
        &self,
        group_id: i32,
        user_id: i32,
        requester_id: i32,
    ) -> AppResult<()> {
        validate_ids(&[group_id, user_id, requester_id])?;
        if user_id != requester_id {
            return Err(AppError::forbidden(
                "You can only withdraw your own join requests",
            ));
        }
        self.existing(group_id).await?;

        if !self.join_requests.delete(user_id, group_id).await? {
            return Err(AppError::not_found("Join request not found"));
        }
        Ok(())
    }

    /// accept_join_request
    ///
    /// Membership insert and request removal happen in one gateway call.
    /// The creator is recorded as the one who admitted the member.
    pub async fn accept_join_request(
        &self,
        group_id: i32,
        user_id: i32,
        requester_id: i32,
    ) -> AppResult<GroupMember> {
        validate_ids(&[group_id, user_id, requester_id])?;
        let group = self.owned(group_id, requester_id).await?;

        if self
            .join_requests
            .find_by_user_and_group(user_id, group_id)
            .await?
            .is_none()
        {
            return Err(AppError::not_found("Join request not found"));
        }

        let member = self
            .join_requests
            .accept(user_id, group_id, group.creator_id)
            .await?;
        tracing::info!(group_id, user_id, "Join request accepted");
        Ok(member)
    }

    pub async fn reject_join_request(
        &self,
        group_id: i32,
        user_id: i32,
        requester_id: i32,
    ) -> AppResult<()> {
        validate_ids(&[group_id, user_id, requester_id])?;
        self.owned(group_id, requester_id).await?;

        if !self.join_requests.delete(user_id, group_id).await? {
            return Err(AppError::not_found("Join request not found"));
        }
        tracing::info!(group_id, user_id, "Join request rejected");
        Ok(())
    }
}
