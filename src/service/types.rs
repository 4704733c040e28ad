//! Query lifecycle types for athena-relay.
//!
//! Defines the values exchanged with the query service: the submitted query,
//! the handle it returns, the execution state machine and the shaped rows.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A query ready for submission. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// SQL text sent verbatim to the service.
    pub sql: String,

    /// Logical database (catalog namespace) the query runs against.
    pub database: String,

    /// URI the service writes its result files to (e.g. `s3://bucket/prefix/`).
    pub output_location: String,
}

impl QueryRequest {
    /// Creates a new query request.
    pub fn new(
        sql: impl Into<String>,
        database: impl Into<String>,
        output_location: impl Into<String>,
    ) -> Self {
        Self {
            sql: sql.into(),
            database: database.into(),
            output_location: output_location.into(),
        }
    }
}

/// Opaque identifier for one asynchronous query run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionHandle(String);

impl ExecutionHandle {
    /// Wraps an identifier issued by the query service.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Execution state as reported by the query service.
///
/// The service owns every transition; this crate only observes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl ExecutionState {
    /// Returns true when no further transition can occur.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Queued | Self::Running => false,
            Self::Succeeded | Self::Failed | Self::Cancelled => true,
        }
    }

    /// Returns the state as the service spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a service state string. Unknown strings yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "QUEUED" => Some(Self::Queued),
            "RUNNING" => Some(Self::Running),
            "SUCCEEDED" => Some(Self::Succeeded),
            "FAILED" => Some(Self::Failed),
            "CANCELLED" | "CANCELED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rows returned by a succeeded execution, every cell flattened to a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Rows in service order; cells in column order.
    pub rows: Vec<Vec<String>>,
}

impl ResultSet {
    /// Creates a result set from already-shaped rows.
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Number of rows, including any header row the service emits.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the result set is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Consumes the result set, returning its rows.
    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }
}

impl<R, C> FromIterator<R> for ResultSet
where
    R: IntoIterator<Item = C>,
    C: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self {
            rows: iter
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }
}
