//! Domain store
//!
//! Owns the cached collections (projects, projects with details, tasks,
//! user tasks, members) and mediates every backend call.
//!
//! # Rules
//!
//! - A fetch marks its domain loading, clears the error and on success
//!   replaces the collection. On failure the error is recorded and the
//!   previous collection stays as it was. Fetches never return errors.
//! - A mutation never edits a collection. On success it re-fetches every
//!   collection it may have changed; on failure it records the error and
//!   returns it to the caller.
//! - Task-detail data (single task, comments, issues) is handed back to the
//!   caller and never cached.
//! - Loading flags are cleared on every path.
//!
//! # Example
//!
//! ```ignore
//! use taskhub_core::store::SyncStore;
//!
//! let store = SyncStore::new(Arc::new(remote), config.tasks.clone());
//! store.fetch_project_by_id("p1").await;
//!
//! let scope = store.current_project_id().await;
//! store.start_task(scope.as_deref(), "t1").await?;
//! ```

mod details;
mod members;
mod projects;
pub mod state;
mod tasks;

pub use state::{Domain, DomainStatus, MembersState, ProjectsState, StoreState, TasksState};

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::TaskConfig;
use crate::domain::{Project, ProjectMember, ProjectWithDetails, Task};
use crate::error::{Error, Result};
use crate::remote::RemoteApi;

/// Shared handle to the domain store
///
/// Cloning is cheap; all clones see the same state.
#[derive(Clone)]
pub struct SyncStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    remote: Arc<dyn RemoteApi>,
    config: TaskConfig,
    state: RwLock<StoreState>,
    closed: AtomicBool,
}

impl std::fmt::Debug for SyncStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncStore")
            .field("page_size", &self.inner.config.page_size)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl SyncStore {
    /// Create a store backed by the given remote
    pub fn new(remote: Arc<dyn RemoteApi>, config: TaskConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                remote,
                config,
                state: RwLock::new(StoreState::default()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn remote(&self) -> &dyn RemoteApi {
        self.inner.remote.as_ref()
    }

    pub(crate) fn page_size(&self) -> u32 {
        self.inner.config.page_size
    }

    // ========== Lifecycle ==========

    /// Tear the store down
    ///
    /// Requests already in flight still complete, but their results are
    /// no longer written.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        debug!("Store closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    // ========== Read access ==========

    /// Copy of the whole state
    pub async fn snapshot(&self) -> StoreState {
        self.inner.state.read().await.clone()
    }

    pub async fn status(&self, domain: Domain) -> DomainStatus {
        self.inner.state.read().await.status(domain).clone()
    }

    pub async fn projects(&self) -> Vec<Project> {
        self.inner.state.read().await.projects.items.clone()
    }

    pub async fn projects_with_details(&self) -> Vec<ProjectWithDetails> {
        self.inner.state.read().await.projects.with_details.clone()
    }

    pub async fn current_project(&self) -> Option<Project> {
        self.inner.state.read().await.projects.current.clone()
    }

    /// Id of the project currently viewed, for use as a refresh scope
    pub async fn current_project_id(&self) -> Option<String> {
        self.inner
            .state
            .read()
            .await
            .current_project_id()
            .map(str::to_string)
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.inner.state.read().await.tasks.items.clone()
    }

    pub async fn user_tasks(&self) -> Vec<Task> {
        self.inner.state.read().await.tasks.user_tasks.clone()
    }

    pub async fn members(&self) -> Vec<ProjectMember> {
        self.inner.state.read().await.members.items.clone()
    }

    /// Forget the last error of a domain
    pub async fn clear_error(&self, domain: Domain) {
        self.write(|state| state.status_mut(domain).error = None).await;
    }

    // ========== Plumbing ==========

    /// Apply a state change unless the store was closed
    pub(crate) async fn write<F>(&self, apply: F)
    where
        F: FnOnce(&mut StoreState),
    {
        if self.is_closed() {
            debug!("Dropping state write after close");
            return;
        }
        let mut state = self.inner.state.write().await;
        apply(&mut state);
    }

    pub(crate) async fn read<R>(&self, read: impl FnOnce(&StoreState) -> R) -> R {
        read(&*self.inner.state.read().await)
    }

    /// Run a remote call with the domain's loading/error bookkeeping
    ///
    /// The outcome is returned unchanged; on failure the error message is
    /// also recorded on the domain.
    pub(crate) async fn track<T, Fut>(&self, domain: Domain, call: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        self.write(|state| state.status_mut(domain).begin()).await;

        match call.await {
            Ok(value) => {
                self.write(|state| state.status_mut(domain).settle()).await;
                Ok(value)
            }
            Err(e) => {
                self.write(|state| state.status_mut(domain).fail(e.to_string())).await;
                Err(e)
            }
        }
    }

    /// Fetch a collection and replace it on success
    ///
    /// Errors are absorbed into the domain status. Returns whether the
    /// collection was replaced.
    pub(crate) async fn load<T, Fut, F>(&self, domain: Domain, call: Fut, replace: F) -> bool
    where
        Fut: Future<Output = Result<T>>,
        F: FnOnce(&mut StoreState, T),
    {
        self.try_load(domain, call, replace).await.is_ok()
    }

    /// Like [`SyncStore::load`], but hands the error back as well
    pub(crate) async fn try_load<T, Fut, F>(
        &self,
        domain: Domain,
        call: Fut,
        replace: F,
    ) -> Result<()>
    where
        Fut: Future<Output = Result<T>>,
        F: FnOnce(&mut StoreState, T),
    {
        self.write(|state| state.status_mut(domain).begin()).await;

        match call.await {
            Ok(items) => {
                self.write(|state| {
                    replace(state, items);
                    state.status_mut(domain).settle();
                })
                .await;
                Ok(())
            }
            Err(e) => {
                warn!(domain = %domain, error = %e, transport = e.is_transport(), "Fetch failed");
                self.write(|state| state.status_mut(domain).fail(e.to_string())).await;
                Err(e)
            }
        }
    }

    /// Record a locally detected failure and hand it back
    pub(crate) async fn reject<T>(&self, domain: Domain, error: Error) -> Result<T> {
        warn!(domain = %domain, error = %error, "Operation rejected");
        self.write(|state| state.status_mut(domain).fail(error.to_string())).await;
        Err(error)
    }
}
