//! Task detail: comments and issues
//!
//! These belong to a single task's detail view. Results go straight back to
//! the caller; only the domain's loading/error status is kept.

use tracing::{debug, info};

use crate::domain::{Comment, Issue, IssueStatus, NewIssue};
use crate::error::{Error, Result};
use crate::remote::RemoteResultExt;

use super::{Domain, SyncStore};

impl SyncStore {
    // ========== Comments ==========

    pub async fn get_task_comments(&self, task_id: &str) -> Result<Vec<Comment>> {
        debug!(task_id = %task_id, "Fetching comments");
        let remote = self.remote();
        self.track(Domain::Comments, async {
            remote
                .list_comments(task_id)
                .await
                .into_data("Failed to fetch comments")
        })
        .await
    }

    pub async fn add_comment(&self, task_id: &str, content: &str) -> Result<Comment> {
        if content.trim().is_empty() {
            return self
                .reject(
                    Domain::Comments,
                    Error::InvalidInput("comment cannot be empty".to_string()),
                )
                .await;
        }

        let remote = self.remote();
        let comment = self
            .track(Domain::Comments, async {
                remote
                    .add_comment(task_id, content)
                    .await
                    .into_data("Failed to add comment")
            })
            .await?;

        info!(task_id = %task_id, comment_id = %comment.id, "Comment added");
        Ok(comment)
    }

    // ========== Issues ==========

    pub async fn get_task_issues(&self, task_id: &str) -> Result<Vec<Issue>> {
        debug!(task_id = %task_id, "Fetching issues");
        let remote = self.remote();
        self.track(Domain::Issues, async {
            remote
                .list_issues(task_id)
                .await
                .into_data("Failed to fetch issues")
        })
        .await
    }

    pub async fn add_issue(&self, task_id: &str, issue: &NewIssue) -> Result<Issue> {
        if issue.title.trim().is_empty() {
            return self
                .reject(
                    Domain::Issues,
                    Error::InvalidInput("issue title is required".to_string()),
                )
                .await;
        }

        let remote = self.remote();
        let created = self
            .track(Domain::Issues, async {
                remote
                    .add_issue(task_id, issue)
                    .await
                    .into_data("Failed to add issue")
            })
            .await?;

        info!(task_id = %task_id, issue_id = %created.id, "Issue reported");
        Ok(created)
    }

    /// Move an issue to any status
    pub async fn update_issue_status(&self, issue_id: &str, status: IssueStatus) -> Result<Issue> {
        let remote = self.remote();
        let issue = self
            .track(Domain::Issues, async {
                remote
                    .update_issue_status(issue_id, status)
                    .await
                    .into_data("Failed to update issue")
            })
            .await?;

        info!(issue_id = %issue_id, status = %status, "Issue status updated");
        Ok(issue)
    }
}
