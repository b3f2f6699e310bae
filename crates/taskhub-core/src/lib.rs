//! Taskhub Core Library
//!
//! Client-side sync layer for the Taskhub team/project/task manager:
//! - Domain types (projects, tasks, members, comments, issues)
//! - Remote API boundary with an HTTP implementation
//! - Domain store with fetch / mutate / re-fetch semantics
//! - Cancellable user search with last-issued-wins arbitration
//! - Configuration

pub mod config;
pub mod domain;
pub mod error;
pub mod remote;
pub mod search;
pub mod store;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::remote::{Envelope, HttpRemote, RemoteApi};
    pub use crate::search::{QueryOutcome, SearchPhase, UserSearch};
    pub use crate::store::{Domain, SyncStore};
}
