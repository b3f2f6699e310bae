//! In-memory backend used by the integration tests
//!
//! Behaves like a small server: mutations are applied to its tables and
//! later list calls see them. Every call is recorded, any operation can be
//! made to fail, and search answers can be held back on a gate.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Once};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use taskhub_core::domain::{
    Comment, Issue, IssueStatus, MemberInvite, MemberRole, NewIssue, NewProject, NewTask, Project,
    ProjectMember, ProjectPatch, ProjectQuery, ProjectStatus, ProjectWithDetails, Task,
    TaskCounts, TaskFilter, TaskPatch, TaskPriority, TaskStatus, TaskSubmission, UserSummary,
};
use taskhub_core::config::{SearchConfig, TaskConfig};
use taskhub_core::remote::{Envelope, RemoteApi, RemoteResult};
use taskhub_core::search::UserSearch;
use taskhub_core::store::SyncStore;
use taskhub_core::Error;

/// Id of the signed-in user
pub const ME: &str = "u-me";

/// A recorded remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: &'static str,
    pub arg: String,
}

/// How a failing operation fails
#[derive(Debug, Clone)]
pub enum Failure {
    /// Backend answers `success = false`
    Domain(Option<String>),
    /// The call itself errors
    Transport(String),
}

#[derive(Debug, Default)]
pub struct Db {
    pub projects: Vec<Project>,
    pub members: HashMap<String, Vec<ProjectMember>>,
    pub tasks: Vec<Task>,
    pub comments: HashMap<String, Vec<Comment>>,
    pub issues: Vec<Issue>,
    pub users: Vec<UserSummary>,
    pub recent: Vec<UserSummary>,
}

#[derive(Default)]
pub struct MockRemote {
    db: Mutex<Db>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<&'static str, Failure>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        init_tracing();
        Arc::new(Self::default())
    }

    pub fn db(&self) -> MutexGuard<'_, Db> {
        self.db.lock().unwrap()
    }

    // ========== Call log ==========

    fn record(&self, op: &'static str, arg: impl Into<String>) {
        self.calls.lock().unwrap().push(Call {
            op,
            arg: arg.into(),
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, op: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.op == op).collect()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls_to(op).len()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    // ========== Failure injection ==========

    pub fn fail(&self, op: &'static str, failure: Failure) {
        self.failures.lock().unwrap().insert(op, failure);
    }

    pub fn fail_domain(&self, op: &'static str, message: &str) {
        self.fail(op, Failure::Domain(Some(message.to_string())));
    }

    pub fn fail_transport(&self, op: &'static str, message: &str) {
        self.fail(op, Failure::Transport(message.to_string()));
    }

    pub fn heal(&self, op: &'static str) {
        self.failures.lock().unwrap().remove(op);
    }

    fn injected<T>(&self, op: &'static str) -> Option<RemoteResult<T>> {
        self.failures.lock().unwrap().get(op).map(|f| match f {
            Failure::Domain(message) => Ok(Envelope {
                success: false,
                data: None,
                message: message.clone(),
            }),
            Failure::Transport(message) => Err(Error::Transport(message.clone())),
        })
    }

    // ========== Search gates ==========

    /// Hold answers to `query` until [`MockRemote::release`] is called
    pub fn hold(&self, query: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(query.to_string(), Arc::new(Notify::new()));
    }

    pub fn release(&self, query: &str) {
        if let Some(gate) = self.gates.lock().unwrap().get(query) {
            gate.notify_one();
        }
    }

    /// Yield until a search for `query` has reached the backend
    pub async fn wait_for_search(&self, query: &str) {
        while !self
            .calls_to("search_users_by_email")
            .iter()
            .any(|c| c.arg == query)
        {
            tokio::task::yield_now().await;
        }
    }
}

fn not_found<T>(what: &str, id: &str) -> RemoteResult<T> {
    Ok(Envelope::failure(format!("{} {} not found", what, id)))
}

fn matches_filter(task: &Task, filter: &TaskFilter) -> bool {
    (filter.status.is_empty() || filter.status.contains(&task.status))
        && (filter.priority.is_empty() || filter.priority.contains(&task.priority))
        && (filter.project_id.is_empty() || filter.project_id.contains(&task.project_id))
}

fn window(tasks: Vec<Task>, filter: &TaskFilter) -> Vec<Task> {
    let from = filter.from.unwrap_or(0) as usize;
    let to = filter.to.map(|t| t as usize).unwrap_or(usize::MAX);
    tasks
        .into_iter()
        .skip(from)
        .take(to.saturating_sub(from))
        .collect()
}

impl MockRemote {
    fn with_task(&self, task_id: &str, apply: impl FnOnce(&mut Task)) -> RemoteResult<Task> {
        let mut db = self.db();
        match db.tasks.iter_mut().find(|t| t.id == task_id) {
            Some(task) => {
                apply(task);
                task.updated_at = Utc::now();
                Ok(Envelope::ok(task.clone()))
            }
            None => not_found("Task", task_id),
        }
    }

    fn with_project(
        &self,
        project_id: &str,
        apply: impl FnOnce(&mut Project),
    ) -> RemoteResult<Project> {
        let mut db = self.db();
        match db.projects.iter_mut().find(|p| p.id == project_id) {
            Some(project) => {
                apply(project);
                project.updated_at = Utc::now();
                Ok(Envelope::ok(project.clone()))
            }
            None => not_found("Project", project_id),
        }
    }
}

#[async_trait]
impl RemoteApi for MockRemote {
    async fn list_projects(&self, query: &ProjectQuery) -> RemoteResult<Vec<Project>> {
        self.record("list_projects", query.status.map(|s| s.to_string()).unwrap_or_default());
        if let Some(f) = self.injected("list_projects") {
            return f;
        }
        let db = self.db();
        Ok(Envelope::ok(
            db.projects
                .iter()
                .filter(|p| query.status.is_none_or(|s| p.status == s))
                .cloned()
                .collect(),
        ))
    }

    async fn list_projects_with_details(
        &self,
        _query: &ProjectQuery,
    ) -> RemoteResult<Vec<ProjectWithDetails>> {
        self.record("list_projects_with_details", "");
        if let Some(f) = self.injected("list_projects_with_details") {
            return f;
        }
        let db = self.db();
        let details = db
            .projects
            .iter()
            .map(|p| {
                let mut counts = TaskCounts::default();
                for task in db.tasks.iter().filter(|t| t.project_id == p.id) {
                    match task.status {
                        TaskStatus::Todo => counts.todo += 1,
                        TaskStatus::InProgress => counts.in_progress += 1,
                        TaskStatus::Done => counts.done += 1,
                        TaskStatus::Cancelled => counts.cancelled += 1,
                    }
                }
                let total = counts.todo + counts.in_progress + counts.done + counts.cancelled;
                ProjectWithDetails {
                    project: p.clone(),
                    total_tasks: total,
                    completed_tasks: counts.done,
                    pending_tasks: counts.todo + counts.in_progress,
                    tasks_by_status: counts,
                }
            })
            .collect();
        Ok(Envelope::ok(details))
    }

    async fn get_project(&self, project_id: &str) -> RemoteResult<Project> {
        self.record("get_project", project_id);
        if let Some(f) = self.injected("get_project") {
            return f;
        }
        let db = self.db();
        match db.projects.iter().find(|p| p.id == project_id) {
            Some(p) => Ok(Envelope::ok(p.clone())),
            None => not_found("Project", project_id),
        }
    }

    async fn create_project(&self, payload: &NewProject) -> RemoteResult<Project> {
        self.record("create_project", payload.name.clone());
        if let Some(f) = self.injected("create_project") {
            return f;
        }
        let mut created = project(&Uuid::new_v4().to_string(), &payload.name);
        created.description = payload.description.clone();
        created.target_date = payload.target_date;
        self.db().projects.push(created.clone());
        Ok(Envelope::ok(created))
    }

    async fn update_project(
        &self,
        project_id: &str,
        patch: &ProjectPatch,
    ) -> RemoteResult<Project> {
        self.record("update_project", project_id);
        if let Some(f) = self.injected("update_project") {
            return f;
        }
        self.with_project(project_id, |p| {
            if let Some(name) = &patch.name {
                p.name = name.clone();
            }
            if let Some(description) = &patch.description {
                p.description = Some(description.clone());
            }
            if let Some(target) = patch.target_date {
                p.target_date = Some(target);
            }
        })
    }

    async fn change_project_status(
        &self,
        project_id: &str,
        status: ProjectStatus,
    ) -> RemoteResult<Project> {
        self.record("change_project_status", format!("{}:{}", project_id, status));
        if let Some(f) = self.injected("change_project_status") {
            return f;
        }
        self.with_project(project_id, |p| p.status = status)
    }

    async fn delete_project(&self, project_id: &str) -> RemoteResult<()> {
        self.record("delete_project", project_id);
        if let Some(f) = self.injected("delete_project") {
            return f;
        }
        self.db().projects.retain(|p| p.id != project_id);
        Ok(Envelope::done())
    }

    async fn list_members(&self, project_id: &str) -> RemoteResult<Vec<ProjectMember>> {
        self.record("list_members", project_id);
        if let Some(f) = self.injected("list_members") {
            return f;
        }
        let db = self.db();
        Ok(Envelope::ok(
            db.members.get(project_id).cloned().unwrap_or_default(),
        ))
    }

    async fn invite_member(
        &self,
        project_id: &str,
        invite: &MemberInvite,
    ) -> RemoteResult<ProjectMember> {
        self.record("invite_member", format!("{}:{}", project_id, invite.email));
        if let Some(f) = self.injected("invite_member") {
            return f;
        }
        let created = ProjectMember {
            id: Uuid::new_v4().to_string(),
            name: invite.email.split('@').next().unwrap_or_default().to_string(),
            email: invite.email.clone(),
            role: invite.role,
        };
        self.db()
            .members
            .entry(project_id.to_string())
            .or_default()
            .push(created.clone());
        Ok(Envelope::ok(created))
    }

    async fn remove_member(&self, project_id: &str, member_id: &str) -> RemoteResult<()> {
        self.record("remove_member", format!("{}:{}", project_id, member_id));
        if let Some(f) = self.injected("remove_member") {
            return f;
        }
        if let Some(members) = self.db().members.get_mut(project_id) {
            members.retain(|m| m.id != member_id);
        }
        Ok(Envelope::done())
    }

    async fn update_member_role(
        &self,
        project_id: &str,
        member_id: &str,
        role: MemberRole,
    ) -> RemoteResult<ProjectMember> {
        self.record("update_member_role", format!("{}:{}:{}", project_id, member_id, role));
        if let Some(f) = self.injected("update_member_role") {
            return f;
        }
        let mut db = self.db();
        let found = db
            .members
            .get_mut(project_id)
            .and_then(|ms| ms.iter_mut().find(|m| m.id == member_id));
        match found {
            Some(m) => {
                m.role = role;
                Ok(Envelope::ok(m.clone()))
            }
            None => not_found("Member", member_id),
        }
    }

    async fn leave_project(&self, project_id: &str) -> RemoteResult<()> {
        self.record("leave_project", project_id);
        if let Some(f) = self.injected("leave_project") {
            return f;
        }
        let mut db = self.db();
        db.projects.retain(|p| p.id != project_id);
        if let Some(members) = db.members.get_mut(project_id) {
            members.retain(|m| m.id != ME);
        }
        Ok(Envelope::done())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> RemoteResult<Vec<Task>> {
        self.record("list_tasks", filter.project_id.join(","));
        if let Some(f) = self.injected("list_tasks") {
            return f;
        }
        let db = self.db();
        let matching = db
            .tasks
            .iter()
            .filter(|t| matches_filter(t, filter))
            .cloned()
            .collect();
        Ok(Envelope::ok(window(matching, filter)))
    }

    async fn list_user_tasks(&self, filter: &TaskFilter) -> RemoteResult<Vec<Task>> {
        self.record("list_user_tasks", "");
        if let Some(f) = self.injected("list_user_tasks") {
            return f;
        }
        let db = self.db();
        let matching = db
            .tasks
            .iter()
            .filter(|t| t.assignees.iter().any(|a| a == ME) && matches_filter(t, filter))
            .cloned()
            .collect();
        Ok(Envelope::ok(window(matching, filter)))
    }

    async fn get_task(&self, task_id: &str) -> RemoteResult<Task> {
        self.record("get_task", task_id);
        if let Some(f) = self.injected("get_task") {
            return f;
        }
        let db = self.db();
        match db.tasks.iter().find(|t| t.id == task_id) {
            Some(t) => Ok(Envelope::ok(t.clone())),
            None => not_found("Task", task_id),
        }
    }

    async fn create_task(&self, payload: &NewTask) -> RemoteResult<Task> {
        self.record("create_task", payload.title.clone());
        if let Some(f) = self.injected("create_task") {
            return f;
        }
        let mut created = task(
            &Uuid::new_v4().to_string(),
            &payload.project_id,
            &payload.title,
            TaskStatus::Todo,
        );
        created.priority = payload.priority;
        created.assignees = payload.assignees.clone();
        created.tags = payload.tags.clone();
        self.db().tasks.push(created.clone());
        Ok(Envelope::ok(created))
    }

    async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> RemoteResult<Task> {
        self.record("update_task", task_id);
        if let Some(f) = self.injected("update_task") {
            return f;
        }
        self.with_task(task_id, |t| {
            if let Some(title) = &patch.title {
                t.title = title.clone();
            }
            if let Some(priority) = patch.priority {
                t.priority = priority;
            }
            if let Some(tags) = &patch.tags {
                t.tags = tags.clone();
            }
        })
    }

    async fn delete_task(&self, task_id: &str) -> RemoteResult<()> {
        self.record("delete_task", task_id);
        if let Some(f) = self.injected("delete_task") {
            return f;
        }
        self.db().tasks.retain(|t| t.id != task_id);
        Ok(Envelope::done())
    }

    async fn change_task_status(&self, task_id: &str, status: TaskStatus) -> RemoteResult<Task> {
        self.record("change_task_status", format!("{}:{}", task_id, status));
        if let Some(f) = self.injected("change_task_status") {
            return f;
        }
        self.with_task(task_id, |t| t.status = status)
    }

    async fn assign_task(&self, task_id: &str, user_ids: &[String]) -> RemoteResult<Task> {
        self.record("assign_task", format!("{}:{}", task_id, user_ids.join(",")));
        if let Some(f) = self.injected("assign_task") {
            return f;
        }
        self.with_task(task_id, |t| t.assignees = user_ids.to_vec())
    }

    async fn start_task(&self, task_id: &str) -> RemoteResult<Task> {
        self.record("start_task", task_id);
        if let Some(f) = self.injected("start_task") {
            return f;
        }
        self.with_task(task_id, |t| t.status = TaskStatus::InProgress)
    }

    async fn submit_task(
        &self,
        task_id: &str,
        submission: &TaskSubmission,
    ) -> RemoteResult<Task> {
        self.record("submit_task", format!("{}:{}", task_id, submission.status));
        if let Some(f) = self.injected("submit_task") {
            return f;
        }
        self.with_task(task_id, |t| t.status = submission.status)
    }

    async fn reject_task(&self, task_id: &str, message: &str) -> RemoteResult<Task> {
        self.record("reject_task", format!("{}:{}", task_id, message));
        if let Some(f) = self.injected("reject_task") {
            return f;
        }
        self.with_task(task_id, |t| t.status = TaskStatus::Todo)
    }

    async fn list_comments(&self, task_id: &str) -> RemoteResult<Vec<Comment>> {
        self.record("list_comments", task_id);
        if let Some(f) = self.injected("list_comments") {
            return f;
        }
        let db = self.db();
        Ok(Envelope::ok(
            db.comments.get(task_id).cloned().unwrap_or_default(),
        ))
    }

    async fn add_comment(&self, task_id: &str, content: &str) -> RemoteResult<Comment> {
        self.record("add_comment", task_id);
        if let Some(f) = self.injected("add_comment") {
            return f;
        }
        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            task_id: task_id.to_string(),
            author_id: ME.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.db()
            .comments
            .entry(task_id.to_string())
            .or_default()
            .push(comment.clone());
        Ok(Envelope::ok(comment))
    }

    async fn list_issues(&self, task_id: &str) -> RemoteResult<Vec<Issue>> {
        self.record("list_issues", task_id);
        if let Some(f) = self.injected("list_issues") {
            return f;
        }
        let db = self.db();
        Ok(Envelope::ok(
            db.issues
                .iter()
                .filter(|i| i.task_id == task_id)
                .cloned()
                .collect(),
        ))
    }

    async fn add_issue(&self, task_id: &str, issue: &NewIssue) -> RemoteResult<Issue> {
        self.record("add_issue", task_id);
        if let Some(f) = self.injected("add_issue") {
            return f;
        }
        let created = Issue {
            id: Uuid::new_v4().to_string(),
            task_id: task_id.to_string(),
            title: issue.title.clone(),
            description: issue.description.clone(),
            status: IssueStatus::Open,
            reporter_id: ME.to_string(),
            created_at: Utc::now(),
        };
        self.db().issues.push(created.clone());
        Ok(Envelope::ok(created))
    }

    async fn update_issue_status(
        &self,
        issue_id: &str,
        status: IssueStatus,
    ) -> RemoteResult<Issue> {
        self.record("update_issue_status", format!("{}:{}", issue_id, status));
        if let Some(f) = self.injected("update_issue_status") {
            return f;
        }
        let mut db = self.db();
        match db.issues.iter_mut().find(|i| i.id == issue_id) {
            Some(issue) => {
                issue.status = status;
                Ok(Envelope::ok(issue.clone()))
            }
            None => not_found("Issue", issue_id),
        }
    }

    async fn search_users_by_email(
        &self,
        query: &str,
        _cancel: CancellationToken,
    ) -> RemoteResult<Vec<UserSummary>> {
        // Ignores the token on purpose: the caller must cope with late answers
        self.record("search_users_by_email", query);
        let gate = self.gates.lock().unwrap().get(query).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(f) = self.injected("search_users_by_email") {
            return f;
        }
        let db = self.db();
        Ok(Envelope::ok(
            db.users
                .iter()
                .filter(|u| u.email.contains(query))
                .cloned()
                .collect(),
        ))
    }

    async fn last_searched_users(&self) -> RemoteResult<Vec<UserSummary>> {
        self.record("last_searched_users", "");
        if let Some(f) = self.injected("last_searched_users") {
            return f;
        }
        Ok(Envelope::ok(self.db().recent.clone()))
    }
}

// ========== Fixtures ==========

pub fn store_for(remote: &Arc<MockRemote>) -> SyncStore {
    SyncStore::new(remote.clone(), TaskConfig::default())
}

pub fn search_for(remote: &Arc<MockRemote>, recent_limit: usize) -> UserSearch {
    UserSearch::new(remote.clone(), SearchConfig { recent_limit })
}

pub fn project(id: &str, name: &str) -> Project {
    let now = Utc::now();
    Project {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        status: ProjectStatus::Active,
        target_date: None,
        members: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

pub fn task(id: &str, project_id: &str, title: &str, status: TaskStatus) -> Task {
    let now = Utc::now();
    Task {
        id: id.to_string(),
        project_id: project_id.to_string(),
        title: title.to_string(),
        description: None,
        status,
        priority: TaskPriority::NoPriority,
        due_date: None,
        assignees: Vec::new(),
        tags: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

pub fn member(id: &str, role: MemberRole) -> ProjectMember {
    ProjectMember {
        id: id.to_string(),
        name: id.to_string(),
        email: format!("{}@example.com", id),
        role,
    }
}

pub fn user(id: &str, email: &str) -> UserSummary {
    UserSummary {
        id: id.to_string(),
        name: id.to_string(),
        email: email.to_string(),
    }
}

pub fn ids<T, F: Fn(&T) -> &str>(items: &[T], id: F) -> Vec<String> {
    items.iter().map(|i| id(i).to_string()).collect()
}

pub fn task_ids(tasks: &[Task]) -> Vec<String> {
    ids(tasks, |t| t.id.as_str())
}

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
