//! HTTP implementation of the remote API
//!
//! Maps each operation onto a REST route under the configured base URL and
//! decodes the JSON [`Envelope`] the backend answers with. A non-2xx status
//! with a decodable envelope is still a domain answer; only undecodable
//! bodies and network failures surface as transport errors. Single-entity
//! reads turn a bare 404 into the matching not-found error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::domain::{
    Comment, Issue, IssueStatus, MemberInvite, MemberRole, NewIssue, NewProject, NewTask, Project,
    ProjectMember, ProjectPatch, ProjectQuery, ProjectStatus, ProjectWithDetails, Task,
    TaskFilter, TaskPatch, TaskStatus, TaskSubmission, UserSummary,
};
use crate::error::{Error, Result};

use super::{Envelope, RemoteApi, RemoteResult};

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// REST client for the Taskhub backend
#[derive(Clone)]
pub struct HttpRemote {
    http_client: HttpClient,
    base_url: Url,
    token: Option<String>,
}

impl std::fmt::Debug for HttpRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRemote")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

/// Builder for creating an HttpRemote
#[derive(Default)]
pub struct HttpRemoteBuilder {
    base_url: Option<String>,
    token: Option<String>,
    timeout_secs: Option<u64>,
}

impl HttpRemoteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take base URL and timeout from configuration
    pub fn config(mut self, config: &ApiConfig) -> Self {
        self.base_url = Some(config.base_url.clone());
        self.timeout_secs = Some(config.timeout_secs);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the session bearer token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn build(self) -> Result<HttpRemote> {
        let raw = self
            .base_url
            .ok_or_else(|| Error::ConfigError("base URL is required".to_string()))?;
        let base_url = Url::parse(&raw)
            .map_err(|e| Error::ConfigError(format!("invalid base URL '{}': {}", raw, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::ConfigError(format!(
                "base URL '{}' cannot carry a path",
                raw
            )));
        }

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(
                self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .map_err(Error::Network)?;

        Ok(HttpRemote {
            http_client,
            base_url,
            token: self.token,
        })
    }
}

impl HttpRemote {
    pub fn builder() -> HttpRemoteBuilder {
        HttpRemoteBuilder::new()
    }

    /// Build from configuration, reading the token from the environment
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let token = config
            .resolved_token()
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        let mut builder = Self::builder().config(config);
        if let Some(token) = token {
            builder = builder.token(token);
        }
        builder.build()
    }

    /// Resolve a route below the base URL, escaping each segment
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::ConfigError("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.url(segments)?;
        let builder = self.http_client.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn get<T: DeserializeOwned + Send>(
        &self,
        segments: &[&str],
        query: &[(&'static str, String)],
    ) -> RemoteResult<T> {
        let request = self.request(Method::GET, segments)?.query(query);
        self.send(request).await
    }

    async fn send_json<T: DeserializeOwned + Send, B: Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> RemoteResult<T> {
        let request = self.request(method, segments)?.json(body);
        self.send(request).await
    }

    async fn send_empty<T: DeserializeOwned + Send>(
        &self,
        method: Method,
        segments: &[&str],
    ) -> RemoteResult<T> {
        let request = self.request(method, segments)?;
        self.send(request).await
    }

    async fn send<T: DeserializeOwned + Send>(&self, request: RequestBuilder) -> RemoteResult<T> {
        self.send_expecting(request, None).await
    }

    /// Send, mapping a bare 404 to `missing` when given
    async fn send_expecting<T: DeserializeOwned + Send>(
        &self,
        request: RequestBuilder,
        missing: Option<Error>,
    ) -> RemoteResult<T> {
        let response = request.send().await.map_err(Error::Network)?;
        let status = response.status();
        let path = response.url().path().to_string();
        let body = response.text().await.map_err(Error::Network)?;

        debug!(path = %path, status = status.as_u16(), "Remote response");
        decode(status, &path, &body, missing)
    }
}

fn decode<T: DeserializeOwned>(
    status: StatusCode,
    path: &str,
    body: &str,
    missing: Option<Error>,
) -> RemoteResult<T> {
    match serde_json::from_str::<Envelope<T>>(body) {
        Ok(envelope) => Ok(envelope),
        Err(e) if status.is_success() => Err(Error::Decode(e)),
        Err(_) => match missing {
            Some(error) if status == StatusCode::NOT_FOUND => Err(error),
            _ => {
                warn!(path = %path, status = status.as_u16(), "Undecodable error response");
                Err(Error::Transport(format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    truncate(body, 200)
                )))
            }
        },
    }
}

fn truncate(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[async_trait]
impl RemoteApi for HttpRemote {
    async fn list_projects(&self, query: &ProjectQuery) -> RemoteResult<Vec<Project>> {
        self.get(&["projects"], &query.to_query_pairs()).await
    }

    async fn list_projects_with_details(
        &self,
        query: &ProjectQuery,
    ) -> RemoteResult<Vec<ProjectWithDetails>> {
        self.get(&["projects", "details"], &query.to_query_pairs()).await
    }

    async fn get_project(&self, project_id: &str) -> RemoteResult<Project> {
        let request = self.request(Method::GET, &["projects", project_id])?;
        self.send_expecting(request, Some(Error::ProjectNotFound(project_id.to_string()))).await
    }

    async fn create_project(&self, payload: &NewProject) -> RemoteResult<Project> {
        self.send_json(Method::POST, &["projects"], payload).await
    }

    async fn update_project(
        &self,
        project_id: &str,
        patch: &ProjectPatch,
    ) -> RemoteResult<Project> {
        self.send_json(Method::PATCH, &["projects", project_id], patch).await
    }

    async fn change_project_status(
        &self,
        project_id: &str,
        status: ProjectStatus,
    ) -> RemoteResult<Project> {
        self.send_json(
            Method::PATCH,
            &["projects", project_id, "status"],
            &json!({ "status": status }),
        )
        .await
    }

    async fn delete_project(&self, project_id: &str) -> RemoteResult<()> {
        self.send_empty(Method::DELETE, &["projects", project_id]).await
    }

    async fn list_members(&self, project_id: &str) -> RemoteResult<Vec<ProjectMember>> {
        self.get(&["projects", project_id, "members"], &[]).await
    }

    async fn invite_member(
        &self,
        project_id: &str,
        invite: &MemberInvite,
    ) -> RemoteResult<ProjectMember> {
        self.send_json(Method::POST, &["projects", project_id, "members"], invite).await
    }

    async fn remove_member(&self, project_id: &str, member_id: &str) -> RemoteResult<()> {
        self.send_empty(
            Method::DELETE,
            &["projects", project_id, "members", member_id],
        )
        .await
    }

    async fn update_member_role(
        &self,
        project_id: &str,
        member_id: &str,
        role: MemberRole,
    ) -> RemoteResult<ProjectMember> {
        self.send_json(
            Method::PATCH,
            &["projects", project_id, "members", member_id, "role"],
            &json!({ "role": role }),
        )
        .await
    }

    async fn leave_project(&self, project_id: &str) -> RemoteResult<()> {
        self.send_empty(Method::POST, &["projects", project_id, "leave"]).await
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> RemoteResult<Vec<Task>> {
        self.get(&["tasks"], &filter.to_query_pairs()).await
    }

    async fn list_user_tasks(&self, filter: &TaskFilter) -> RemoteResult<Vec<Task>> {
        self.get(&["tasks", "me"], &filter.to_query_pairs()).await
    }

    async fn get_task(&self, task_id: &str) -> RemoteResult<Task> {
        let request = self.request(Method::GET, &["tasks", task_id])?;
        self.send_expecting(request, Some(Error::TaskNotFound(task_id.to_string()))).await
    }

    async fn create_task(&self, payload: &NewTask) -> RemoteResult<Task> {
        self.send_json(Method::POST, &["tasks"], payload).await
    }

    async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> RemoteResult<Task> {
        self.send_json(Method::PATCH, &["tasks", task_id], patch).await
    }

    async fn delete_task(&self, task_id: &str) -> RemoteResult<()> {
        self.send_empty(Method::DELETE, &["tasks", task_id]).await
    }

    async fn change_task_status(&self, task_id: &str, status: TaskStatus) -> RemoteResult<Task> {
        self.send_json(
            Method::PATCH,
            &["tasks", task_id, "status"],
            &json!({ "status": status }),
        )
        .await
    }

    async fn assign_task(&self, task_id: &str, user_ids: &[String]) -> RemoteResult<Task> {
        self.send_json(
            Method::PUT,
            &["tasks", task_id, "assignees"],
            &json!({ "userIds": user_ids }),
        )
        .await
    }

    async fn start_task(&self, task_id: &str) -> RemoteResult<Task> {
        self.send_empty(Method::POST, &["tasks", task_id, "start"]).await
    }

    async fn submit_task(
        &self,
        task_id: &str,
        submission: &TaskSubmission,
    ) -> RemoteResult<Task> {
        self.send_json(Method::POST, &["tasks", task_id, "submit"], submission).await
    }

    async fn reject_task(&self, task_id: &str, message: &str) -> RemoteResult<Task> {
        self.send_json(
            Method::POST,
            &["tasks", task_id, "reject"],
            &json!({ "message": message }),
        )
        .await
    }

    async fn list_comments(&self, task_id: &str) -> RemoteResult<Vec<Comment>> {
        self.get(&["tasks", task_id, "comments"], &[]).await
    }

    async fn add_comment(&self, task_id: &str, content: &str) -> RemoteResult<Comment> {
        self.send_json(
            Method::POST,
            &["tasks", task_id, "comments"],
            &json!({ "content": content }),
        )
        .await
    }

    async fn list_issues(&self, task_id: &str) -> RemoteResult<Vec<Issue>> {
        self.get(&["tasks", task_id, "issues"], &[]).await
    }

    async fn add_issue(&self, task_id: &str, issue: &NewIssue) -> RemoteResult<Issue> {
        self.send_json(Method::POST, &["tasks", task_id, "issues"], issue).await
    }

    async fn update_issue_status(
        &self,
        issue_id: &str,
        status: IssueStatus,
    ) -> RemoteResult<Issue> {
        self.send_json(
            Method::PATCH,
            &["issues", issue_id, "status"],
            &json!({ "status": status }),
        )
        .await
    }

    async fn search_users_by_email(
        &self,
        query: &str,
        cancel: CancellationToken,
    ) -> RemoteResult<Vec<UserSummary>> {
        let request = self
            .request(Method::GET, &["users", "search"])?
            .query(&[("email", query)]);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(query = %query, "User search aborted");
                Err(Error::Cancelled)
            }
            result = self.send(request) => result,
        }
    }

    async fn last_searched_users(&self) -> RemoteResult<Vec<UserSummary>> {
        self.get(&["users", "last-searched"], &[]).await
    }
}
