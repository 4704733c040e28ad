//! Error types for athena-relay.
//!
//! Every stage of a query lifecycle has its own variant so callers can tell a
//! rejected submission apart from a slow query or a failed execution.

use std::time::Duration;

use thiserror::Error;

use crate::service::ExecutionState;

/// Main error type for athena-relay operations.
#[derive(Error, Debug)]
pub enum RelayError {
    /// The query service rejected or never received the submission.
    #[error("Submission error: {0}")]
    Submission(String),

    /// A state check failed twice in a row.
    #[error("Poll error: {0}")]
    Poll(String),

    /// The execution did not reach a terminal state before the deadline.
    #[error("Poll timeout: no terminal state after {elapsed:?}")]
    PollTimeout { elapsed: Duration },

    /// The service refused to return results for a succeeded execution.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The execution finished in a state other than SUCCEEDED.
    #[error("Query finished in state {state}")]
    QueryExecution { state: ExecutionState },

    /// The caller cancelled the wait.
    #[error("Query wait was cancelled")]
    Cancelled,

    /// The request could not be turned into a query (bad table name, empty SQL).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Creates a submission error with the given message.
    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }

    /// Creates a poll error with the given message.
    pub fn poll(msg: impl Into<String>) -> Self {
        Self::Poll(msg.into())
    }

    /// Creates a fetch error with the given message.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Creates an invalid request error with the given message.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Submission(_) => "Submission Error",
            Self::Poll(_) => "Poll Error",
            Self::PollTimeout { .. } => "Poll Timeout",
            Self::Fetch(_) => "Fetch Error",
            Self::QueryExecution { .. } => "Query Execution Error",
            Self::Cancelled => "Cancelled",
            Self::InvalidRequest(_) => "Invalid Request",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the terminal state carried by a `QueryExecution` error.
    pub fn terminal_state(&self) -> Option<ExecutionState> {
        match self {
            Self::QueryExecution { state } => Some(*state),
            _ => None,
        }
    }
}

/// Result type alias using RelayError.
pub type Result<T> = std::result::Result<T, RelayError>;
