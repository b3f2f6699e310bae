//! Project operations
//!
//! Any project mutation makes both the plain list and the details list
//! stale, so both are re-fetched.

use tracing::{debug, info, warn};

use crate::domain::{NewProject, Project, ProjectPatch, ProjectQuery, ProjectStatus};
use crate::error::{Error, Result};
use crate::remote::RemoteResultExt;

use super::{Domain, SyncStore};

impl SyncStore {
    // ========== Fetches ==========

    /// Replace the project list
    pub async fn fetch_projects(&self, query: &ProjectQuery) {
        debug!(status = ?query.status, "Fetching projects");
        let remote = self.remote();
        let remembered = query.clone();
        self.load(
            Domain::Projects,
            async { remote.list_projects(query).await.into_data("Failed to fetch projects") },
            move |state, items| {
                state.projects.items = items;
                state.projects.query = remembered;
            },
        )
        .await;
    }

    /// Replace the list of projects with their task aggregates
    pub async fn fetch_projects_with_details(&self, query: &ProjectQuery) {
        debug!(status = ?query.status, "Fetching projects with details");
        let remote = self.remote();
        let remembered = query.clone();
        self.load(
            Domain::Projects,
            async {
                remote
                    .list_projects_with_details(query)
                    .await
                    .into_data("Failed to fetch project details")
            },
            move |state, items| {
                state.projects.with_details = items;
                state.projects.details_query = remembered;
            },
        )
        .await;
    }

    /// Load a project and make it the current one
    pub async fn fetch_project_by_id(&self, project_id: &str) {
        debug!(project_id = %project_id, "Fetching project");
        let remote = self.remote();
        self.load(
            Domain::Projects,
            async {
                remote
                    .get_project(project_id)
                    .await
                    .into_data("Failed to fetch project")
            },
            |state, project| state.projects.current = Some(project),
        )
        .await;
    }

    // ========== Current project ==========

    pub async fn set_current_project(&self, project: Project) {
        debug!(project_id = %project.id, "Current project set");
        self.write(|state| state.projects.current = Some(project)).await;
    }

    pub async fn clear_current_project(&self) {
        self.write(|state| state.projects.current = None).await;
    }

    // ========== Mutations ==========

    pub async fn create_project(&self, payload: &NewProject) -> Result<Project> {
        if payload.name.trim().is_empty() {
            return self
                .reject(
                    Domain::Projects,
                    Error::InvalidInput("project name is required".to_string()),
                )
                .await;
        }

        let remote = self.remote();
        let project = self
            .track(Domain::Projects, async {
                remote
                    .create_project(payload)
                    .await
                    .into_data("Failed to create project")
            })
            .await?;

        info!(project_id = %project.id, name = %project.name, "Project created");
        self.refresh_projects(None).await;
        Ok(project)
    }

    pub async fn update_project(&self, project_id: &str, patch: &ProjectPatch) -> Result<Project> {
        if patch.is_empty() {
            return self
                .reject(
                    Domain::Projects,
                    Error::InvalidInput("nothing to update".to_string()),
                )
                .await;
        }

        let remote = self.remote();
        let project = self
            .track(Domain::Projects, async {
                remote
                    .update_project(project_id, patch)
                    .await
                    .into_data("Failed to update project")
            })
            .await?;

        info!(project_id = %project_id, "Project updated");
        self.refresh_projects(Some(project_id)).await;
        Ok(project)
    }

    pub async fn change_project_status(
        &self,
        project_id: &str,
        status: ProjectStatus,
    ) -> Result<Project> {
        let remote = self.remote();
        let project = self
            .track(Domain::Projects, async {
                remote
                    .change_project_status(project_id, status)
                    .await
                    .into_data("Failed to change project status")
            })
            .await?;

        info!(project_id = %project_id, status = %status, "Project status changed");
        self.refresh_projects(Some(project_id)).await;
        Ok(project)
    }

    pub async fn delete_project(&self, project_id: &str) -> Result<()> {
        let remote = self.remote();
        self.track(Domain::Projects, async {
            remote
                .delete_project(project_id)
                .await
                .into_unit("Failed to delete project")
        })
        .await?;

        info!(project_id = %project_id, "Project deleted");
        self.drop_current_project(project_id).await;
        self.refresh_projects(None).await;
        Ok(())
    }

    /// Leave a project as the signed-in user
    pub async fn leave_project(&self, project_id: &str) -> Result<()> {
        let remote = self.remote();
        self.track(Domain::Projects, async {
            remote
                .leave_project(project_id)
                .await
                .into_unit("Failed to leave project")
        })
        .await?;

        info!(project_id = %project_id, "Left project");
        self.drop_current_project(project_id).await;
        self.refresh_projects(None).await;
        Ok(())
    }

    // ========== Refresh ==========

    /// Re-fetch both project lists with the queries last used
    ///
    /// `changed` is also re-fetched when it is the current project. The
    /// calls share the Projects status, so it is settled once at the end and
    /// keeps the first failure.
    async fn refresh_projects(&self, changed: Option<&str>) {
        let (query, details_query, reload) = self
            .read(|state| {
                (
                    state.projects.query.clone(),
                    state.projects.details_query.clone(),
                    changed.filter(|id| state.current_project_id() == Some(*id)),
                )
            })
            .await;

        let remote = self.remote();
        self.write(|state| state.projects.status.begin()).await;

        let (items, details, current) = tokio::join!(
            async { remote.list_projects(&query).await.into_data("Failed to fetch projects") },
            async {
                remote
                    .list_projects_with_details(&details_query)
                    .await
                    .into_data("Failed to fetch project details")
            },
            async {
                match reload {
                    Some(id) => Some(
                        remote
                            .get_project(id)
                            .await
                            .into_data("Failed to fetch project"),
                    ),
                    None => None,
                }
            },
        );

        let mut failure = None;
        self.write(|state| {
            match items {
                Ok(items) => state.projects.items = items,
                Err(e) => failure = failure.take().or(Some(e)),
            }
            match details {
                Ok(details) => state.projects.with_details = details,
                Err(e) => failure = failure.take().or(Some(e)),
            }
            match current {
                Some(Ok(project)) => state.projects.current = Some(project),
                Some(Err(e)) => failure = failure.take().or(Some(e)),
                None => {}
            }
            match &failure {
                Some(e) => state.projects.status.fail(e.to_string()),
                None => state.projects.status.settle(),
            }
        })
        .await;

        if let Some(e) = failure {
            warn!(error = %e, transport = e.is_transport(), "Project refresh failed");
        }
    }

    /// Re-fetch the per-project task aggregates with the query last used
    pub(super) async fn refresh_project_details(&self) {
        let query = self.read(|state| state.projects.details_query.clone()).await;
        self.fetch_projects_with_details(&query).await;
    }

    async fn drop_current_project(&self, project_id: &str) {
        self.write(|state| {
            if state.current_project_id() == Some(project_id) {
                state.projects.current = None;
            }
        })
        .await;
    }
}
