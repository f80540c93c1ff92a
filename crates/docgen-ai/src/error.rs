//! Failures of the text-generation boundary.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by a [`crate::TextGenerator`].
///
/// The conversion core treats every variant as "delegation unavailable".
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdapterError {
    /// Credentials were rejected by the remote platform.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The remote service failed or returned an unusable response.
    #[error(
        "remote service error{}: {message}",
        .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
    )]
    RemoteService {
        status: Option<u16>,
        message: String,
    },

    /// The call did not finish within the configured budget.
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl AdapterError {
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteService {
            status: None,
            message: message.into(),
        }
    }

    /// Authentication failures make every further call in the run pointless.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// Returns a short message suitable for a summary table.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Authentication(_) => "AI service rejected the configured credentials.",
            Self::RemoteService { .. } => "AI service request failed.",
            Self::Timeout(_) => "AI service did not answer in time.",
        }
    }
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;
