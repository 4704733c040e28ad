//! Query lifecycle for athena-relay.
//!
//! This module composes submission, polling and result fetching on top of a
//! [`QueryService`](crate::service::QueryService), and builds the fixed
//! queries the HTTP layer exposes.

pub mod lifecycle;
pub mod wait;

pub use lifecycle::QueryLifecycle;
pub use wait::{ExponentialBackoff, FixedInterval, PollPolicy, WaitStrategy};

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{RelayError, Result};

/// Rows returned by a table preview.
pub const TABLE_PREVIEW_LIMIT: usize = 10;

fn table_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*){0,2}$")
            .unwrap_or_else(|e| panic!("table name pattern is invalid: {e}"))
    })
}

/// Builds the preview query for `table_name`.
///
/// Only plain identifiers, optionally qualified as `db.table` or
/// `catalog.db.table`, are accepted so the name can be spliced into SQL.
pub fn table_preview_sql(table_name: &str) -> Result<String> {
    let table_name = table_name.trim();

    if table_name.is_empty() {
        return Err(RelayError::invalid_request("Table name must not be empty"));
    }
    if !table_name_pattern().is_match(table_name) {
        return Err(RelayError::invalid_request(format!(
            "Invalid table name '{}'",
            table_name
        )));
    }

    Ok(format!(
        "SELECT * FROM {} LIMIT {}",
        table_name, TABLE_PREVIEW_LIMIT
    ))
}
