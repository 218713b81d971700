use std::time::Duration;

use touchline_core::error::CoreError;
use touchline_core::types::RowId;

/// Failure reported by the external store behind a backend trait.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Network or transport failure; worth retrying.
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Row {0} not found")]
    NotFound(RowId),

    /// The store refused the operation (constraint, permission, ...).
    #[error("Rejected by store: {0}")]
    Rejected(String),
}

/// Errors surfaced by subscriptions, commands and uploads.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("{operation} timed out after {}ms", after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    /// A command was issued to a feed slot with nothing mounted.
    #[error("No subscription is mounted")]
    NotMounted,
}

impl SyncError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display() {
        let err = SyncError::Timeout {
            operation: "fetch",
            after: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "fetch timed out after 5000ms");
        assert!(err.is_timeout());
    }

    #[test]
    fn backend_error_is_transparent() {
        let err: SyncError = BackendError::Request("connection reset".into()).into();
        assert_eq!(err.to_string(), "Request failed: connection reset");
        assert!(!err.is_timeout());
    }
}
