//! Incremental user lookup by email
//!
//! # States
//!
//! - **Idle**: empty query; suggestions are the recent selections
//! - **InFlight**: a lookup for the current query is outstanding
//! - **Settled**: the latest lookup's answer is shown
//!
//! Overlapping lookups are arbitrated by [`RequestArbiter`]: only the most
//! recently issued lookup may update the suggestions.

pub mod arbiter;

pub use arbiter::{RequestArbiter, Ticket};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::domain::UserSummary;
use crate::remote::{RemoteApi, RemoteResultExt};

/// Phase of the search state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    #[default]
    Idle,
    InFlight,
    Settled,
}

/// What happened to a query change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Query was empty; suggestions fell back to recent selections
    Cleared,
    /// The answer was applied to the suggestions
    Applied,
    /// A newer query was issued meanwhile; the answer was dropped
    Superseded,
}

#[derive(Debug, Default)]
struct SearchState {
    query: String,
    phase: SearchPhase,
    results: Vec<UserSummary>,
    recent: Vec<UserSummary>,
    selected: Option<UserSummary>,
    error: Option<String>,
    arbiter: RequestArbiter,
}

/// User lookup with last-issued-wins semantics
pub struct UserSearch {
    remote: Arc<dyn RemoteApi>,
    config: SearchConfig,
    state: Mutex<SearchState>,
}

impl std::fmt::Debug for UserSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("UserSearch")
            .field("query", &state.query)
            .field("phase", &state.phase)
            .field("results", &state.results.len())
            .finish()
    }
}

impl UserSearch {
    pub fn new(remote: Arc<dyn RemoteApi>, config: SearchConfig) -> Self {
        Self {
            remote,
            config,
            state: Mutex::new(SearchState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, SearchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========== Queries ==========

    /// React to a change of the query text
    ///
    /// Any outstanding lookup is cancelled. The answer to this lookup is
    /// applied only if no newer query was issued while it was pending.
    pub async fn set_query(&self, text: &str) -> QueryOutcome {
        let fragment = text.trim().to_string();

        let ticket = {
            let mut state = self.state();
            state.query = text.to_string();
            if fragment.is_empty() {
                Self::go_idle(&mut state);
                return QueryOutcome::Cleared;
            }
            state.phase = SearchPhase::InFlight;
            state.arbiter.issue()
        };

        debug!(query = %fragment, generation = ticket.generation(), "Searching users");
        let outcome = self
            .remote
            .search_users_by_email(&fragment, ticket.token())
            .await
            .into_data("Failed to search users");

        let mut state = self.state();
        if !state.arbiter.settle(&ticket) {
            debug!(query = %fragment, generation = ticket.generation(), "Discarding stale search response");
            return QueryOutcome::Superseded;
        }

        match outcome {
            Ok(users) => {
                state.results = users;
                state.error = None;
            }
            Err(e) => {
                warn!(query = %fragment, error = %e, "User search failed");
                state.results.clear();
                state.error = Some(e.to_string());
            }
        }
        state.phase = SearchPhase::Settled;
        QueryOutcome::Applied
    }

    /// Drop the query and any outstanding lookup
    pub fn clear(&self) {
        let mut state = self.state();
        state.query.clear();
        Self::go_idle(&mut state);
    }

    fn go_idle(state: &mut SearchState) {
        state.arbiter.reset();
        state.phase = SearchPhase::Idle;
        state.results.clear();
        state.error = None;
    }

    // ========== Selection ==========

    /// Record a picked suggestion locally, without a round trip
    pub fn choose(&self, user: UserSummary) {
        let mut state = self.state();
        state.recent.retain(|u| u.id != user.id);
        state.recent.insert(0, user.clone());
        state.recent.truncate(self.config.recent_limit);
        state.selected = Some(user);
        state.query.clear();
        Self::go_idle(&mut state);
    }

    /// Pick a suggestion, then refresh the recent list from the backend
    pub async fn select(&self, user: UserSummary) {
        info!(user_id = %user.id, "User selected from search");
        self.choose(user);
        self.refresh_recent().await;
    }

    /// Reload the recent selections, capped at `recent_limit`
    ///
    /// Failures are logged and ignored.
    pub async fn refresh_recent(&self) {
        let outcome = self
            .remote
            .last_searched_users()
            .await
            .into_data("Failed to load recent searches");

        match outcome {
            Ok(mut users) => {
                users.truncate(self.config.recent_limit);
                self.state().recent = users;
            }
            Err(e) => warn!(error = %e, "Ignoring failed refresh of recent searches"),
        }
    }

    // ========== Read access ==========

    /// What the suggestion list should show right now
    ///
    /// Idle shows the recent selections; otherwise the last applied results.
    pub fn suggestions(&self) -> Vec<UserSummary> {
        let state = self.state();
        match state.phase {
            SearchPhase::Idle => state.recent.clone(),
            SearchPhase::InFlight | SearchPhase::Settled => state.results.clone(),
        }
    }

    pub fn phase(&self) -> SearchPhase {
        self.state().phase
    }

    pub fn query(&self) -> String {
        self.state().query.clone()
    }

    pub fn recent(&self) -> Vec<UserSummary> {
        self.state().recent.clone()
    }

    pub fn selected(&self) -> Option<UserSummary> {
        self.state().selected.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }
}
