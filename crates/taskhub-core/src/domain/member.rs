//! Project membership types

use serde::{Deserialize, Serialize};
use std::fmt;

use super::user::UserSummary;

/// Role of a member within a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Admin,
    #[default]
    Member,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "owner" => Some(Self::Owner),
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            _ => None,
        }
    }

    /// Owners and admins may edit the project and its membership
    pub fn can_manage(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's membership in a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: MemberRole,
}

impl ProjectMember {
    pub fn is_owner(&self) -> bool {
        self.role == MemberRole::Owner
    }
}

/// Find the member holding the owner role
pub fn owner_of(members: &[ProjectMember]) -> Option<&ProjectMember> {
    members.iter().find(|m| m.is_owner())
}

/// Invitation of a user into a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInvite {
    pub email: String,
    pub role: MemberRole,
}

impl MemberInvite {
    pub fn new(email: impl Into<String>, role: MemberRole) -> Self {
        Self {
            email: email.into(),
            role,
        }
    }
}

impl From<&UserSummary> for MemberInvite {
    fn from(user: &UserSummary) -> Self {
        Self::new(user.email.clone(), MemberRole::Member)
    }
}
