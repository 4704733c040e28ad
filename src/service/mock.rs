//! Mock query service for testing.
//!
//! Provides an in-memory implementation whose executions walk through a
//! scripted sequence of states. Used by tests and by `--mock-service`.

use super::{ExecutionHandle, ExecutionState, QueryRequest, QueryService, ResultSet};
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// The states and rows one mock execution will produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedExecution {
    /// States returned by successive state checks; the last one repeats.
    pub states: Vec<ExecutionState>,
    /// Rows returned on fetch. `None` echoes the submitted SQL.
    pub rows: Option<Vec<Vec<String>>>,
}

impl ScriptedExecution {
    /// Queued once, running once, then succeeded.
    pub fn succeeding() -> Self {
        Self::with_states(vec![
            ExecutionState::Queued,
            ExecutionState::Running,
            ExecutionState::Succeeded,
        ])
    }

    /// Never leaves RUNNING.
    pub fn running_forever() -> Self {
        Self::with_states(vec![ExecutionState::Running])
    }

    /// Walks through the given states.
    pub fn with_states(states: Vec<ExecutionState>) -> Self {
        Self { states, rows: None }
    }

    /// Sets the rows returned once the execution has succeeded.
    pub fn returning<R, C>(mut self, rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.rows = Some(ResultSet::from_iter(rows).into_rows());
        self
    }
}

impl Default for ScriptedExecution {
    fn default() -> Self {
        Self::succeeding()
    }
}

#[derive(Debug)]
struct MockExecution {
    sql: String,
    script: ScriptedExecution,
    checks: usize,
    observed: Option<ExecutionState>,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    default_script: ScriptedExecution,
    scripts_by_sql: HashMap<String, ScriptedExecution>,
    executions: HashMap<ExecutionHandle, MockExecution>,
    reject_submissions: Option<String>,
    failing_state_checks: usize,
    fail_results: Option<String>,
    total_state_checks: usize,
    result_calls: usize,
    stop_calls: Vec<ExecutionHandle>,
}

/// A mock query service that replays scripted executions.
#[derive(Debug, Default)]
pub struct MockQueryService {
    state: Mutex<MockState>,
}

impl MockQueryService {
    /// Creates a mock whose executions succeed after one QUEUED and one RUNNING check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock that uses `script` for every submission.
    pub fn with_script(script: ScriptedExecution) -> Self {
        let service = Self::new();
        service.lock().default_script = script;
        service
    }

    /// Uses `script` for submissions whose SQL is exactly `sql`.
    pub fn script_for(self, sql: impl Into<String>, script: ScriptedExecution) -> Self {
        self.lock().scripts_by_sql.insert(sql.into(), script);
        self
    }

    /// Rejects every submission with the given message.
    pub fn reject_submissions(self, message: impl Into<String>) -> Self {
        self.lock().reject_submissions = Some(message.into());
        self
    }

    /// Makes the next `count` state checks fail with a transport error.
    pub fn fail_next_state_checks(&self, count: usize) {
        self.lock().failing_state_checks = count;
    }

    /// Makes every result fetch fail with the given message.
    pub fn fail_results(self, message: impl Into<String>) -> Self {
        self.lock().fail_results = Some(message.into());
        self
    }

    /// Number of executions started so far.
    pub fn submissions(&self) -> usize {
        self.lock().executions.len()
    }

    /// Number of state checks made for one handle, failed ones excluded.
    pub fn state_checks(&self, handle: &ExecutionHandle) -> usize {
        self.lock()
            .executions
            .get(handle)
            .map(|execution| execution.checks)
            .unwrap_or(0)
    }

    /// Number of state check calls across all handles, failed ones included.
    pub fn total_state_checks(&self) -> usize {
        self.lock().total_state_checks
    }

    /// Number of result fetch calls.
    pub fn result_calls(&self) -> usize {
        self.lock().result_calls
    }

    /// Handles for which a stop was requested.
    pub fn stop_calls(&self) -> Vec<ExecutionHandle> {
        self.lock().stop_calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the state from the others.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl QueryService for MockQueryService {
    async fn start_execution(&self, request: &QueryRequest) -> Result<ExecutionHandle> {
        let mut state = self.lock();

        if let Some(message) = &state.reject_submissions {
            return Err(RelayError::submission(message.clone()));
        }
        if request.sql.trim().is_empty() {
            return Err(RelayError::submission("Query string must not be empty"));
        }

        state.next_id += 1;
        let handle = ExecutionHandle::new(format!("mock-exec-{:06}", state.next_id));
        let script = state
            .scripts_by_sql
            .get(&request.sql)
            .cloned()
            .unwrap_or_else(|| state.default_script.clone());

        state.executions.insert(
            handle.clone(),
            MockExecution {
                sql: request.sql.clone(),
                script,
                checks: 0,
                observed: None,
            },
        );

        Ok(handle)
    }

    async fn get_execution_state(&self, handle: &ExecutionHandle) -> Result<ExecutionState> {
        let mut state = self.lock();
        state.total_state_checks += 1;

        if state.failing_state_checks > 0 {
            state.failing_state_checks -= 1;
            return Err(RelayError::poll("mock transport error"));
        }

        let execution = state
            .executions
            .get_mut(handle)
            .ok_or_else(|| RelayError::poll(format!("Unknown execution {}", handle)))?;

        let last = execution.script.states.len().saturating_sub(1);
        let current = execution
            .script
            .states
            .get(execution.checks.min(last))
            .copied()
            .unwrap_or(ExecutionState::Succeeded);

        execution.checks += 1;
        execution.observed = Some(current);
        Ok(current)
    }

    async fn get_results(&self, handle: &ExecutionHandle) -> Result<ResultSet> {
        let mut state = self.lock();
        state.result_calls += 1;

        if let Some(message) = &state.fail_results {
            return Err(RelayError::fetch(message.clone()));
        }

        let execution = state
            .executions
            .get(handle)
            .ok_or_else(|| RelayError::fetch(format!("Unknown execution {}", handle)))?;

        if execution.observed != Some(ExecutionState::Succeeded) {
            return Err(RelayError::fetch(format!(
                "Execution {} has not succeeded",
                handle
            )));
        }

        let rows = match &execution.script.rows {
            Some(rows) => rows.clone(),
            None => vec![vec!["result".to_string()], vec![execution.sql.clone()]],
        };

        Ok(ResultSet::new(rows))
    }

    async fn stop_execution(&self, handle: &ExecutionHandle) -> Result<()> {
        self.lock().stop_calls.push(handle.clone());
        Ok(())
    }
}
