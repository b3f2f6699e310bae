//! Remote API boundary
//!
//! Every backend call answers with an [`Envelope`]: a success flag, an
//! optional payload and an optional message. The trait [`RemoteApi`] is the
//! only way the store and search components reach the backend.

pub mod http;

pub use http::{HttpRemote, HttpRemoteBuilder};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::domain::{
    Comment, Issue, IssueStatus, MemberInvite, MemberRole, NewIssue, NewProject, NewTask, Project,
    ProjectMember, ProjectPatch, ProjectQuery, ProjectStatus, ProjectWithDetails, Task,
    TaskFilter, TaskPatch, TaskStatus, TaskSubmission, UserSummary,
};
use crate::error::{Error, Result};

/// Response shape shared by every backend call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Convert into the payload, or a domain error
    ///
    /// A failure without a message uses `fallback`. A success without a
    /// payload is reported the same way since the caller needs the data.
    pub fn into_data(self, fallback: &str) -> Result<T> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(Error::Remote(format!("{}: empty response", fallback))),
            (false, _) => Err(Error::Remote(message_or(self.message, fallback))),
        }
    }

    /// Convert into unit for calls whose payload is irrelevant
    pub fn into_unit(self, fallback: &str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(Error::Remote(message_or(self.message, fallback)))
        }
    }
}

impl Envelope<()> {
    pub fn done() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
        }
    }
}

fn message_or(message: Option<String>, fallback: &str) -> String {
    message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Outcome of a remote call: `Err` means the call itself failed
pub type RemoteResult<T> = Result<Envelope<T>>;

/// Collapse transport and domain failures into one `Result`
pub trait RemoteResultExt<T> {
    fn into_data(self, fallback: &str) -> Result<T>;

    fn into_unit(self, fallback: &str) -> Result<()>;
}

impl<T> RemoteResultExt<T> for RemoteResult<T> {
    fn into_data(self, fallback: &str) -> Result<T> {
        self.and_then(|envelope| envelope.into_data(fallback))
    }

    fn into_unit(self, fallback: &str) -> Result<()> {
        self.and_then(|envelope| envelope.into_unit(fallback))
    }
}

/// Operations offered by the backend, grouped by entity family
#[async_trait]
pub trait RemoteApi: Send + Sync {
    // ========== Projects ==========

    async fn list_projects(&self, query: &ProjectQuery) -> RemoteResult<Vec<Project>>;

    async fn list_projects_with_details(
        &self,
        query: &ProjectQuery,
    ) -> RemoteResult<Vec<ProjectWithDetails>>;

    async fn get_project(&self, project_id: &str) -> RemoteResult<Project>;

    async fn create_project(&self, payload: &NewProject) -> RemoteResult<Project>;

    async fn update_project(&self, project_id: &str, patch: &ProjectPatch)
    -> RemoteResult<Project>;

    async fn change_project_status(
        &self,
        project_id: &str,
        status: ProjectStatus,
    ) -> RemoteResult<Project>;

    async fn delete_project(&self, project_id: &str) -> RemoteResult<()>;

    // ========== Members ==========

    async fn list_members(&self, project_id: &str) -> RemoteResult<Vec<ProjectMember>>;

    async fn invite_member(
        &self,
        project_id: &str,
        invite: &MemberInvite,
    ) -> RemoteResult<ProjectMember>;

    async fn remove_member(&self, project_id: &str, member_id: &str) -> RemoteResult<()>;

    async fn update_member_role(
        &self,
        project_id: &str,
        member_id: &str,
        role: MemberRole,
    ) -> RemoteResult<ProjectMember>;

    async fn leave_project(&self, project_id: &str) -> RemoteResult<()>;

    // ========== Tasks ==========

    async fn list_tasks(&self, filter: &TaskFilter) -> RemoteResult<Vec<Task>>;

    /// Tasks assigned to the signed-in user, across projects
    async fn list_user_tasks(&self, filter: &TaskFilter) -> RemoteResult<Vec<Task>>;

    async fn get_task(&self, task_id: &str) -> RemoteResult<Task>;

    async fn create_task(&self, payload: &NewTask) -> RemoteResult<Task>;

    async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> RemoteResult<Task>;

    async fn delete_task(&self, task_id: &str) -> RemoteResult<()>;

    async fn change_task_status(&self, task_id: &str, status: TaskStatus) -> RemoteResult<Task>;

    async fn assign_task(&self, task_id: &str, user_ids: &[String]) -> RemoteResult<Task>;

    async fn start_task(&self, task_id: &str) -> RemoteResult<Task>;

    async fn submit_task(&self, task_id: &str, submission: &TaskSubmission)
    -> RemoteResult<Task>;

    async fn reject_task(&self, task_id: &str, message: &str) -> RemoteResult<Task>;

    // ========== Comments & Issues ==========

    async fn list_comments(&self, task_id: &str) -> RemoteResult<Vec<Comment>>;

    async fn add_comment(&self, task_id: &str, content: &str) -> RemoteResult<Comment>;

    async fn list_issues(&self, task_id: &str) -> RemoteResult<Vec<Issue>>;

    async fn add_issue(&self, task_id: &str, issue: &NewIssue) -> RemoteResult<Issue>;

    async fn update_issue_status(&self, issue_id: &str, status: IssueStatus)
    -> RemoteResult<Issue>;

    // ========== Users ==========

    /// Look up users by an email fragment
    ///
    /// `cancel` fires when a newer query supersedes this one. Honouring it
    /// is optional; callers discard superseded results regardless.
    async fn search_users_by_email(
        &self,
        query: &str,
        cancel: CancellationToken,
    ) -> RemoteResult<Vec<UserSummary>>;

    /// Users the signed-in user recently picked from search
    async fn last_searched_users(&self) -> RemoteResult<Vec<UserSummary>>;
}
