//! Error types for ChatVault media-core
//!
//! This module defines error types using thiserror for ergonomic error handling.
//! Errors are categorized by where they arise in the download lifecycle
//! (starting a download, polling its status, the service reporting a failure)
//! so the console can render them distinctly and decide about retries.
//!
//! Every error is local to one media item. A failed poll for one message never
//! affects the state of any sibling item.

use thiserror::Error;

/// Result type alias using our VaultError type
pub type Result<T> = std::result::Result<T, VaultError>;

/// Main error type for ChatVault media-core
#[derive(Error, Debug)]
pub enum VaultError {
    // ===== Download Lifecycle Errors =====

    /// Initiating the download request failed (network or 5xx)
    #[error("Download request failed: {message}")]
    RequestFailed {
        message: String,
        /// HTTP status code if the service answered at all
        status_code: Option<u16>,
    },

    /// A status poll failed (network or 5xx) while a download was in flight
    #[error("Status poll failed: {message}")]
    PollFailed {
        message: String,
        status_code: Option<u16>,
    },

    /// The service explicitly reported the download as failed
    #[error("Download failed: {0}")]
    RemoteFailure(String),

    /// No terminal status arrived within the session's wall-clock budget
    #[error("Download timed out after {0} seconds")]
    Timeout(u64),

    /// Download cancelled by the user; resets the item, never shown as an error
    #[error("Download cancelled")]
    Cancelled,

    // ===== State/Input Errors =====

    /// The controller is in the wrong state for the requested operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Generic input validation error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration is invalid or incomplete
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // ===== External Library Errors =====
    // Automatic conversions from external error types

    /// HTTP client error from reqwest
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

// Helper methods for creating common errors
impl VaultError {
    /// Create a RequestFailed error
    pub fn request_failed<S: Into<String>>(message: S, status_code: Option<u16>) -> Self {
        VaultError::RequestFailed {
            message: message.into(),
            status_code,
        }
    }

    /// Create a PollFailed error
    pub fn poll_failed<S: Into<String>>(message: S, status_code: Option<u16>) -> Self {
        VaultError::PollFailed {
            message: message.into(),
            status_code,
        }
    }

    /// Check if error is transient (a fresh start() might succeed)
    ///
    /// Returns `true` for network-shaped failures and timeouts. Failures the
    /// service reported explicitly are not considered transient: the engine
    /// already gave up on the file.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VaultError::RequestFailed { status_code: None, .. }
                | VaultError::RequestFailed { status_code: Some(500..=599), .. }
                | VaultError::PollFailed { status_code: None, .. }
                | VaultError::PollFailed { status_code: Some(500..=599), .. }
                | VaultError::Timeout(_)
                | VaultError::ReqwestError(_)
        )
    }

    /// Check if error represents a user-initiated cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, VaultError::Cancelled)
    }

    /// Get user-friendly error message suitable for display
    ///
    /// Technical details are omitted where they would not help the operator.
    pub fn user_message(&self) -> String {
        match self {
            VaultError::RequestFailed { status_code: Some(code), .. } => {
                format!("Could not start the download (server error {}). Please try again.", code)
            }
            VaultError::RequestFailed { status_code: None, .. } => {
                "Could not reach the download service. Check your connection and try again."
                    .to_string()
            }
            VaultError::PollFailed { .. } => {
                "Lost contact with the download service. Please try again.".to_string()
            }
            VaultError::RemoteFailure(reason) => {
                format!("The download engine reported a failure: {}", reason)
            }
            VaultError::Timeout(secs) => {
                format!("The download did not finish within {} seconds. Please try again.", secs)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(VaultError::poll_failed("connection reset", None).is_retryable());
        assert!(VaultError::request_failed("bad gateway", Some(502)).is_retryable());
        assert!(VaultError::Timeout(60).is_retryable());

        assert!(!VaultError::request_failed("not found", Some(404)).is_retryable());
        assert!(!VaultError::RemoteFailure("file vanished upstream".to_string()).is_retryable());
        assert!(!VaultError::Cancelled.is_retryable());
    }

    #[test]
    fn test_user_message_hides_transport_detail() {
        let err = VaultError::poll_failed("hyper::Error(IncompleteMessage)", None);
        let msg = err.user_message();
        assert!(!msg.contains("hyper"));
        assert!(!msg.is_empty());
    }

    #[test]
    fn test_cancelled_is_not_an_error_to_retry() {
        let err = VaultError::Cancelled;
        assert!(err.is_cancelled());
        assert!(!err.is_retryable());
    }
}
