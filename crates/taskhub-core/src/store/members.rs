//! Project membership operations
//!
//! A project has exactly one owner. The owner can neither be removed nor
//! have its role changed through these operations, and no member can be
//! promoted to owner; such requests are refused before reaching the backend.

use tracing::{debug, info};

use crate::domain::{MemberInvite, MemberRole, ProjectMember, owner_of};
use crate::error::{Error, Result};
use crate::remote::RemoteResultExt;

use super::{Domain, SyncStore};

impl SyncStore {
    /// Replace the member list with the members of `project_id`
    pub async fn fetch_project_members(&self, project_id: &str) {
        // Failure is recorded on the Members status
        let _ = self.load_members(project_id).await;
    }

    async fn load_members(&self, project_id: &str) -> Result<()> {
        debug!(project_id = %project_id, "Fetching project members");
        let remote = self.remote();
        let owner = project_id.to_string();
        self.try_load(
            Domain::Members,
            async {
                remote
                    .list_members(project_id)
                    .await
                    .into_data("Failed to fetch project members")
            },
            move |state, items| {
                state.members.items = items;
                state.members.project_id = Some(owner);
            },
        )
        .await
    }

    pub async fn invite_member(
        &self,
        project_id: &str,
        invite: &MemberInvite,
    ) -> Result<ProjectMember> {
        if !invite.email.contains('@') {
            return self
                .reject(
                    Domain::Members,
                    Error::InvalidInput(format!("'{}' is not an email address", invite.email)),
                )
                .await;
        }
        if invite.role == MemberRole::Owner {
            return self
                .reject(Domain::Members, Error::OwnershipChange(invite.email.clone()))
                .await;
        }

        let remote = self.remote();
        let member = self
            .track(Domain::Members, async {
                remote
                    .invite_member(project_id, invite)
                    .await
                    .into_data("Failed to invite member")
            })
            .await?;

        info!(project_id = %project_id, email = %invite.email, role = %invite.role, "Member invited");
        self.fetch_project_members(project_id).await;
        Ok(member)
    }

    /// Remove a member from a project
    ///
    /// Refused without a backend call when the member is the owner, or when
    /// ownership cannot be determined.
    pub async fn remove_project_member(&self, project_id: &str, member_id: &str) -> Result<()> {
        if self.is_owner(project_id, member_id).await? {
            return self
                .reject(Domain::Members, Error::OwnerRemoval(member_id.to_string()))
                .await;
        }

        let remote = self.remote();
        self.track(Domain::Members, async {
            remote
                .remove_member(project_id, member_id)
                .await
                .into_unit("Failed to remove member")
        })
        .await?;

        info!(project_id = %project_id, member_id = %member_id, "Member removed");
        self.fetch_project_members(project_id).await;
        Ok(())
    }

    pub async fn update_member_role(
        &self,
        project_id: &str,
        member_id: &str,
        role: MemberRole,
    ) -> Result<ProjectMember> {
        if role == MemberRole::Owner || self.is_owner(project_id, member_id).await? {
            return self
                .reject(Domain::Members, Error::OwnershipChange(member_id.to_string()))
                .await;
        }

        let remote = self.remote();
        let member = self
            .track(Domain::Members, async {
                remote
                    .update_member_role(project_id, member_id, role)
                    .await
                    .into_data("Failed to update member role")
            })
            .await?;

        info!(project_id = %project_id, member_id = %member_id, role = %role, "Member role updated");
        self.fetch_project_members(project_id).await;
        Ok(member)
    }

    /// Whether `member_id` owns `project_id`
    ///
    /// Uses the cached list when it belongs to this project, otherwise
    /// fetches the members first. Fails when the list cannot be loaded.
    async fn is_owner(&self, project_id: &str, member_id: &str) -> Result<bool> {
        let cached = self
            .read(|state| {
                state
                    .members
                    .for_project(project_id)
                    .map(|members| owns(members, member_id))
            })
            .await;
        if let Some(owner) = cached {
            return Ok(owner);
        }

        self.load_members(project_id).await?;
        self.read(|state| {
            state
                .members
                .for_project(project_id)
                .map(|members| owns(members, member_id))
        })
        .await
        .ok_or_else(|| Error::Other("Project members are unavailable".to_string()))
    }
}

fn owns(members: &[ProjectMember], member_id: &str) -> bool {
    owner_of(members).is_some_and(|owner| owner.id == member_id)
}
