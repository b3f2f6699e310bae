//! User references returned by search

use serde::{Deserialize, Serialize};

/// Minimal user reference used for lookups and invitations
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}
