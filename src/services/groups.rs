use super::auth::Identity;
use super::users::Accounts;
use super::{RequestHandler, Service, ServiceError};

use crate::models::groups::{
    normalize_email, Group, GroupDetails, GroupMember, GroupSummary, Invitation, MemberStatus,
    NewGroup,
};
use crate::repositories::groups::GroupRepository;
use crate::repositories::users::UserRepository;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

pub enum GroupRequest {
    Create {
        identity: Identity,
        group: NewGroup,
        response: oneshot::Sender<Result<Group, ServiceError>>,
    },
    List {
        identity: Identity,
        response: oneshot::Sender<Result<Vec<GroupSummary>, ServiceError>>,
    },
    Get {
        identity: Identity,
        group_id: String,
        response: oneshot::Sender<Result<GroupDetails, ServiceError>>,
    },
    Invite {
        identity: Identity,
        group_id: String,
        invitation: Invitation,
        response: oneshot::Sender<Result<GroupMember, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct GroupRequestHandler {
    groups: Arc<dyn GroupRepository>,
    users: Arc<dyn UserRepository>,
    accounts: Accounts,
}

impl GroupRequestHandler {
    pub fn new(
        groups: Arc<dyn GroupRepository>,
        users: Arc<dyn UserRepository>,
        accounts: Accounts,
    ) -> Self {
        GroupRequestHandler {
            groups,
            users,
            accounts,
        }
    }

    async fn find_group(&self, group_id: &str) -> Result<Group, ServiceError> {
        self.groups
            .get_group(group_id)
            .await
            .map_err(ServiceError::repository("GroupRepository"))?
            .ok_or_else(|| ServiceError::NotFound(format!("Group {}", group_id)))
    }

    async fn membership(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Option<GroupMember>, ServiceError> {
        self.groups
            .membership(group_id, user_id)
            .await
            .map_err(ServiceError::repository("GroupRepository"))
    }

    async fn create(&self, identity: &Identity, mut group: NewGroup) -> Result<Group, ServiceError> {
        group.name = group.name.trim().to_string();
        if group.name.is_empty() {
            return Err(ServiceError::InvalidInput("name is required".to_string()));
        }

        let owner = self.accounts.ensure_user(identity).await?;
        let group = self
            .groups
            .create_group(&owner.id, &owner.email, &group)
            .await
            .map_err(ServiceError::repository("GroupRepository"))?;
        log::info!("Group {} created by {}.", group.id, owner.id);

        Ok(group)
    }

    async fn list(&self, identity: &Identity) -> Result<Vec<GroupSummary>, ServiceError> {
        self.groups
            .groups_for_user(&identity.user_id)
            .await
            .map_err(ServiceError::repository("GroupRepository"))
    }

    async fn get(&self, identity: &Identity, group_id: &str) -> Result<GroupDetails, ServiceError> {
        let group = self.find_group(group_id).await?;
        match self.membership(group_id, &identity.user_id).await? {
            Some(member) if member.status == MemberStatus::Active => {}
            _ => {
                return Err(ServiceError::Forbidden(format!(
                    "Not an active member of group {}",
                    group_id
                )))
            }
        }

        let members = self
            .groups
            .members(group_id)
            .await
            .map_err(ServiceError::repository("GroupRepository"))?;

        Ok(GroupDetails { group, members })
    }

    async fn invite(
        &self,
        identity: &Identity,
        group_id: &str,
        invitation: Invitation,
    ) -> Result<GroupMember, ServiceError> {
        self.find_group(group_id).await?;
        let is_admin = self
            .membership(group_id, &identity.user_id)
            .await?
            .is_some_and(|member| member.is_active_admin());
        if !is_admin {
            return Err(ServiceError::Forbidden(
                "Only group administrators can invite".to_string(),
            ));
        }

        let email = normalize_email(&invitation.email);
        if !email.contains('@') {
            return Err(ServiceError::InvalidInput(format!(
                "Invalid email: {}",
                invitation.email
            )));
        }

        let existing = self
            .groups
            .membership_by_email(group_id, &email)
            .await
            .map_err(ServiceError::repository("GroupRepository"))?;
        if let Some(existing) = existing.filter(|member| member.status.blocks_invitation()) {
            return Err(ServiceError::DuplicateInvitation(format!(
                "{} is already {}",
                email,
                existing.status.as_str()
            )));
        }

        let invitee = self
            .users
            .find_user_by_email(&email)
            .await
            .map_err(ServiceError::repository("UserRepository"))?;

        let member = self
            .groups
            .upsert_invitation(
                group_id,
                &email,
                invitee.as_ref().map(|user| user.id.as_str()),
                &identity.user_id,
            )
            .await
            .map_err(ServiceError::repository("GroupRepository"))?;

        match member {
            Some(member) => {
                log::info!("{} invited to group {} by {}.", email, group_id, identity.user_id);
                Ok(member)
            }
            None => Err(ServiceError::DuplicateInvitation(format!(
                "{} is already a member or invited",
                email
            ))),
        }
    }
}

#[async_trait]
impl RequestHandler<GroupRequest> for GroupRequestHandler {
    async fn handle_request(&self, request: GroupRequest) {
        match request {
            GroupRequest::Create {
                identity,
                group,
                response,
            } => {
                let _ = response.send(self.create(&identity, group).await);
            }
            GroupRequest::List { identity, response } => {
                let _ = response.send(self.list(&identity).await);
            }
            GroupRequest::Get {
                identity,
                group_id,
                response,
            } => {
                let _ = response.send(self.get(&identity, &group_id).await);
            }
            GroupRequest::Invite {
                identity,
                group_id,
                invitation,
                response,
            } => {
                let result = self.invite(&identity, &group_id, invitation).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct GroupService;

impl GroupService {
    pub fn new() -> Self {
        GroupService {}
    }
}

#[async_trait]
impl Service<GroupRequest, GroupRequestHandler> for GroupService {}
