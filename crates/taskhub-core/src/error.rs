//! Error types for Taskhub

use thiserror::Error;

/// Result type alias using Taskhub's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Taskhub error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Entity errors (E001-E099)
    #[error("Project '{0}' not found.")]
    ProjectNotFound(String),

    #[error("Task '{0}' not found.")]
    TaskNotFound(String),

    // Remote errors (E100-E199)
    /// The backend answered but reported failure
    #[error("{0}")]
    Remote(String),

    /// The call never produced a usable answer
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Network error: {0}. Check your internet connection.")]
    Network(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    // Membership errors (E200-E299)
    #[error("Cannot remove '{0}': the project owner can only leave by transferring ownership.")]
    OwnerRemoval(String),

    #[error("Cannot change role of '{0}': a project has exactly one owner.")]
    OwnershipChange(String),

    // Search errors (E300-E399)
    #[error("Request superseded by a newer query")]
    Cancelled,

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProjectNotFound(_) => "E001",
            Self::TaskNotFound(_) => "E002",
            Self::Remote(_) => "E100",
            Self::Transport(_) => "E101",
            Self::Network(_) => "E102",
            Self::Decode(_) => "E103",
            Self::OwnerRemoval(_) => "E200",
            Self::OwnershipChange(_) => "E201",
            Self::Cancelled => "E300",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Network(_) | Self::Transport(_) => Some("Check internet connection".to_string()),
            Self::OwnerRemoval(_) => Some("Transfer ownership before removing the owner".to_string()),
            Self::ConfigError(_) => Some("Check TASKHUB_CONFIG_DIR/config.toml".to_string()),
            _ => None,
        }
    }

    /// Whether the remote call itself failed, as opposed to the backend
    /// reporting `success = false`
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Network(_) | Self::Decode(_) | Self::Io(_)
        )
    }
}
