//! Error taxonomy shared by the write path and the read path.

use thiserror::Error;

/// Which external collaborator a failed call was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    DocumentStore,
    SearchIndex,
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Service::DocumentStore => write!(f, "document store"),
            Service::SearchIndex => write!(f, "search index"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    /// Schema/record mismatch or a wiring mistake. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A call to the document store or the index failed.
    #[error("{service} call failed: {message}")]
    ExternalService { service: Service, message: String },

    /// The event does not carry the snapshot its kind requires.
    #[error("invalid change event {event_id}: {reason}")]
    InvalidEvent { event_id: String, reason: String },
}

impl SyncError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        SyncError::ExternalService {
            service: Service::DocumentStore,
            message: err.to_string(),
        }
    }

    pub fn index(err: impl std::fmt::Display) -> Self {
        SyncError::ExternalService {
            service: Service::SearchIndex,
            message: err.to_string(),
        }
    }

    /// Whether redelivering the same event could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::ExternalService { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
