//! Task operations
//!
//! Every task mutation takes a refresh scope: the id of the project being
//! viewed, if any. With a scope the project's task list is re-fetched;
//! without one the user-task list is re-fetched instead. Either way the
//! per-project task aggregates are re-fetched too.

use tracing::{debug, info};

use crate::domain::{NewTask, Task, TaskFilter, TaskPatch, TaskStatus, TaskSubmission};
use crate::error::{Error, Result};
use crate::remote::RemoteResultExt;

use super::{Domain, SyncStore};

impl SyncStore {
    // ========== Fetches ==========

    /// Replace the task list with the tasks matching `filter`
    ///
    /// Order is kept as returned by the backend.
    pub async fn fetch_tasks(&self, filter: &TaskFilter) {
        debug!(project_id = ?filter.scoped_project(), filter = ?filter, "Fetching tasks");
        let remote = self.remote();
        self.load(
            Domain::Tasks,
            async { remote.list_tasks(filter).await.into_data("Failed to fetch tasks") },
            |state, items| state.tasks.items = items,
        )
        .await;
    }

    /// Replace the task list with the first page of a project's tasks
    pub async fn fetch_project_tasks(&self, project_id: &str) {
        let filter = TaskFilter::for_project(project_id).window(0, self.page_size());
        self.fetch_tasks(&filter).await;
    }

    /// Replace the user-task list
    pub async fn fetch_all_user_tasks(&self, filter: &TaskFilter) {
        debug!(filter = ?filter, "Fetching user tasks");
        let remote = self.remote();
        let remembered = filter.clone();
        self.load(
            Domain::Tasks,
            async {
                remote
                    .list_user_tasks(filter)
                    .await
                    .into_data("Failed to fetch your tasks")
            },
            move |state, items| {
                state.tasks.user_tasks = items;
                state.tasks.user_filter = remembered;
            },
        )
        .await;
    }

    /// Load a single task without caching it
    pub async fn fetch_task_by_id(&self, task_id: &str) -> Result<Task> {
        debug!(task_id = %task_id, "Fetching task");
        self.remote()
            .get_task(task_id)
            .await
            .into_data("Failed to fetch task")
    }

    // ========== Mutations ==========

    pub async fn create_task(&self, scope: Option<&str>, payload: &NewTask) -> Result<Task> {
        if payload.title.trim().is_empty() {
            return self
                .reject(
                    Domain::Tasks,
                    Error::InvalidInput("task title is required".to_string()),
                )
                .await;
        }

        let remote = self.remote();
        let task = self
            .track(Domain::Tasks, async {
                remote
                    .create_task(payload)
                    .await
                    .into_data("Failed to create task")
            })
            .await?;

        info!(task_id = %task.id, project_id = %task.project_id, "Task created");
        self.refresh_tasks(scope).await;
        Ok(task)
    }

    pub async fn update_task(
        &self,
        scope: Option<&str>,
        task_id: &str,
        patch: &TaskPatch,
    ) -> Result<Task> {
        let remote = self.remote();
        let task = self
            .track(Domain::Tasks, async {
                remote
                    .update_task(task_id, patch)
                    .await
                    .into_data("Failed to update task")
            })
            .await?;

        info!(task_id = %task_id, "Task updated");
        self.refresh_tasks(scope).await;
        Ok(task)
    }

    pub async fn delete_task(&self, scope: Option<&str>, task_id: &str) -> Result<()> {
        let remote = self.remote();
        self.track(Domain::Tasks, async {
            remote
                .delete_task(task_id)
                .await
                .into_unit("Failed to delete task")
        })
        .await?;

        info!(task_id = %task_id, "Task deleted");
        self.refresh_tasks(scope).await;
        Ok(())
    }

    pub async fn change_task_status(
        &self,
        scope: Option<&str>,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<Task> {
        let remote = self.remote();
        let task = self
            .track(Domain::Tasks, async {
                remote
                    .change_task_status(task_id, status)
                    .await
                    .into_data("Failed to change task status")
            })
            .await?;

        info!(task_id = %task_id, status = %status, "Task status changed");
        self.refresh_tasks(scope).await;
        Ok(task)
    }

    /// Replace the assignees of a task; an empty list unassigns everyone
    pub async fn assign_task(
        &self,
        scope: Option<&str>,
        task_id: &str,
        user_ids: &[String],
    ) -> Result<Task> {
        let remote = self.remote();
        let task = self
            .track(Domain::Tasks, async {
                remote
                    .assign_task(task_id, user_ids)
                    .await
                    .into_data("Failed to assign task")
            })
            .await?;

        info!(task_id = %task_id, assignees = user_ids.len(), "Task assigned");
        self.refresh_tasks(scope).await;
        Ok(task)
    }

    pub async fn start_task(&self, scope: Option<&str>, task_id: &str) -> Result<Task> {
        let remote = self.remote();
        let task = self
            .track(Domain::Tasks, async {
                remote
                    .start_task(task_id)
                    .await
                    .into_data("Failed to start task")
            })
            .await?;

        info!(task_id = %task_id, "Task started");
        self.refresh_tasks(scope).await;
        Ok(task)
    }

    /// Hand in a task, proposing its new status
    pub async fn submit_task(
        &self,
        scope: Option<&str>,
        task_id: &str,
        submission: &TaskSubmission,
    ) -> Result<Task> {
        let remote = self.remote();
        let task = self
            .track(Domain::Tasks, async {
                remote
                    .submit_task(task_id, submission)
                    .await
                    .into_data("Failed to submit task")
            })
            .await?;

        info!(task_id = %task_id, status = %submission.status, "Task submitted");
        self.refresh_tasks(scope).await;
        Ok(task)
    }

    /// Send a submitted task back with a reason
    pub async fn reject_task(
        &self,
        scope: Option<&str>,
        task_id: &str,
        message: &str,
    ) -> Result<Task> {
        if message.trim().is_empty() {
            return self
                .reject(
                    Domain::Tasks,
                    Error::InvalidInput("a rejection reason is required".to_string()),
                )
                .await;
        }

        let remote = self.remote();
        let task = self
            .track(Domain::Tasks, async {
                remote
                    .reject_task(task_id, message)
                    .await
                    .into_data("Failed to reject task")
            })
            .await?;

        info!(task_id = %task_id, "Task rejected");
        self.refresh_tasks(scope).await;
        Ok(task)
    }

    // ========== Refresh ==========

    async fn refresh_tasks(&self, scope: Option<&str>) {
        match scope {
            Some(project_id) => self.fetch_project_tasks(project_id).await,
            None => {
                debug!("No project scope, refreshing user tasks");
                let filter = self.read(|state| state.tasks.user_filter.clone()).await;
                self.fetch_all_user_tasks(&filter).await;
            }
        }
        self.refresh_project_details().await;
    }
}
