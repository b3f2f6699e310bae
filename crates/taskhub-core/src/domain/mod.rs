//! Domain types
//!
//! Plain data exchanged with the backend. Nothing here talks to the network
//! or holds shared state.
//!
//! - **Projects**: `Project`, `ProjectWithDetails`, `ProjectQuery`
//! - **Tasks**: `Task`, `TaskFilter`, `TaskSubmission`
//! - **Membership**: `ProjectMember`, `MemberRole`, `MemberInvite`
//! - **Task detail**: `Comment`, `Issue`
//! - **Users**: `UserSummary`

pub mod comment;
pub mod issue;
pub mod member;
pub mod project;
pub mod task;
pub mod user;

// Re-export main types
pub use comment::Comment;
pub use issue::{Issue, IssueStatus, NewIssue};
pub use member::{MemberInvite, MemberRole, ProjectMember, owner_of};
pub use project::{
    NewProject, Project, ProjectPatch, ProjectQuery, ProjectStatus, ProjectWithDetails, TaskCounts,
};
pub use task::{NewTask, Task, TaskFilter, TaskPatch, TaskPriority, TaskStatus, TaskSubmission};
pub use user::UserSummary;
