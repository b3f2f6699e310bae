//! State held by the store
//!
//! Collections are only ever replaced wholesale by a successful fetch.

use serde::Serialize;
use std::fmt;

use crate::domain::{Project, ProjectMember, ProjectQuery, ProjectWithDetails, Task, TaskFilter};

/// A named slice of the store with its own loading/error fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Projects,
    Tasks,
    Members,
    Comments,
    Issues,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Tasks => "tasks",
            Self::Members => "members",
            Self::Comments => "comments",
            Self::Issues => "issues",
        }
    }

    pub fn all() -> [Self; 5] {
        [
            Self::Projects,
            Self::Tasks,
            Self::Members,
            Self::Comments,
            Self::Issues,
        ]
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Loading flag and last error of a domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DomainStatus {
    pub loading: bool,
    pub error: Option<String>,
}

impl DomainStatus {
    pub(crate) fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub(crate) fn settle(&mut self) {
        self.loading = false;
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectsState {
    pub items: Vec<Project>,
    pub with_details: Vec<ProjectWithDetails>,
    /// Project currently viewed; its id scopes dependent refreshes
    pub current: Option<Project>,
    pub status: DomainStatus,
    #[serde(skip)]
    pub(crate) query: ProjectQuery,
    #[serde(skip)]
    pub(crate) details_query: ProjectQuery,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TasksState {
    pub items: Vec<Task>,
    /// Tasks of the signed-in user across projects
    pub user_tasks: Vec<Task>,
    pub status: DomainStatus,
    #[serde(skip)]
    pub(crate) user_filter: TaskFilter,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MembersState {
    /// Project the member list belongs to
    pub project_id: Option<String>,
    pub items: Vec<ProjectMember>,
    pub status: DomainStatus,
}

impl MembersState {
    /// Cached members, if they were fetched for `project_id`
    pub fn for_project(&self, project_id: &str) -> Option<&[ProjectMember]> {
        match &self.project_id {
            Some(id) if id == project_id => Some(&self.items),
            _ => None,
        }
    }
}

/// Everything the store holds
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreState {
    pub projects: ProjectsState,
    pub tasks: TasksState,
    pub members: MembersState,
    pub comments: DomainStatus,
    pub issues: DomainStatus,
}

impl StoreState {
    pub fn status(&self, domain: Domain) -> &DomainStatus {
        match domain {
            Domain::Projects => &self.projects.status,
            Domain::Tasks => &self.tasks.status,
            Domain::Members => &self.members.status,
            Domain::Comments => &self.comments,
            Domain::Issues => &self.issues,
        }
    }

    pub(crate) fn status_mut(&mut self, domain: Domain) -> &mut DomainStatus {
        match domain {
            Domain::Projects => &mut self.projects.status,
            Domain::Tasks => &mut self.tasks.status,
            Domain::Members => &mut self.members.status,
            Domain::Comments => &mut self.comments,
            Domain::Issues => &mut self.issues,
        }
    }

    pub fn current_project_id(&self) -> Option<&str> {
        self.projects.current.as_ref().map(|p| p.id.as_str())
    }

    /// Whether any domain is mid-request
    pub fn is_loading(&self) -> bool {
        Domain::all().iter().any(|d| self.status(*d).loading)
    }
}
