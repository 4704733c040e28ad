//! Query lifecycle: submit, wait for a terminal state, fetch rows.
//!
//! `QueryLifecycle` holds no per-query state, so one instance can drive any
//! number of concurrent executions.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::wait::{FixedInterval, PollPolicy, WaitStrategy};
use crate::error::{RelayError, Result};
use crate::service::{ExecutionHandle, ExecutionState, QueryRequest, QueryService, ResultSet};

/// Drives queries through a [`QueryService`].
#[derive(Clone)]
pub struct QueryLifecycle {
    service: Arc<dyn QueryService>,
    wait: Arc<dyn WaitStrategy>,
    stop_on_abort: bool,
}

impl QueryLifecycle {
    /// Creates a lifecycle that polls at a fixed interval.
    pub fn new(service: Arc<dyn QueryService>) -> Self {
        Self {
            service,
            wait: Arc::new(FixedInterval),
            stop_on_abort: false,
        }
    }

    /// Replaces the wait strategy.
    pub fn with_wait_strategy(mut self, wait: Arc<dyn WaitStrategy>) -> Self {
        self.wait = wait;
        self
    }

    /// Ask the service to stop executions abandoned by timeout or cancellation.
    pub fn with_stop_on_abort(mut self, stop_on_abort: bool) -> Self {
        self.stop_on_abort = stop_on_abort;
        self
    }

    /// Submits a query and returns its execution handle.
    pub async fn submit(&self, request: &QueryRequest) -> Result<ExecutionHandle> {
        if request.sql.trim().is_empty() {
            return Err(RelayError::submission("Query string must not be empty"));
        }
        if request.database.trim().is_empty() {
            return Err(RelayError::submission("Database must not be empty"));
        }
        if request.output_location.trim().is_empty() {
            return Err(RelayError::submission("Output location must not be empty"));
        }

        let handle = self
            .service
            .start_execution(request)
            .await
            .map_err(|e| match e {
                RelayError::Submission(_) => e,
                other => RelayError::submission(other.to_string()),
            })?;

        debug!("Submitted execution {}", handle);
        Ok(handle)
    }

    /// Waits until `handle` reaches a terminal state.
    pub async fn await_terminal(
        &self,
        handle: &ExecutionHandle,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<ExecutionState> {
        self.await_terminal_with_cancel(
            handle,
            &PollPolicy::new(poll_interval, timeout),
            &CancellationToken::new(),
        )
        .await
    }

    /// Waits until `handle` reaches a terminal state, the policy's timeout
    /// elapses, or `cancel` fires.
    pub async fn await_terminal_with_cancel(
        &self,
        handle: &ExecutionHandle,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<ExecutionState> {
        let result = self.poll_until_terminal(handle, policy, cancel).await;

        if self.stop_on_abort
            && matches!(
                result,
                Err(RelayError::PollTimeout { .. }) | Err(RelayError::Cancelled)
            )
        {
            if let Err(e) = self.service.stop_execution(handle).await {
                warn!("Could not stop abandoned execution {}: {}", handle, e);
            }
        }

        result
    }

    async fn poll_until_terminal(
        &self,
        handle: &ExecutionHandle,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<ExecutionState> {
        let started = Instant::now();
        let deadline = started.checked_add(policy.timeout).ok_or_else(|| {
            RelayError::config(format!(
                "Poll timeout of {:?} is out of range",
                policy.timeout
            ))
        })?;
        let mut attempt: u32 = 0;

        loop {
            let checked = tokio::select! {
                biased;

                _ = cancel.cancelled() => return Err(RelayError::Cancelled),
                checked = tokio::time::timeout_at(deadline, self.check_state(handle)) => checked,
            };

            let state = match checked {
                Ok(state) => state?,
                Err(_) => {
                    return Err(RelayError::PollTimeout {
                        elapsed: started.elapsed(),
                    })
                }
            };

            if state.is_terminal() {
                info!(
                    "Execution {} reached {} after {:?}",
                    handle,
                    state,
                    started.elapsed()
                );
                return Ok(state);
            }

            let elapsed = started.elapsed();
            if elapsed >= policy.timeout {
                return Err(RelayError::PollTimeout { elapsed });
            }

            // Never sleep past the deadline.
            let delay = self
                .wait
                .next_delay(attempt, policy.poll_interval)
                .min(policy.timeout - elapsed);
            attempt = attempt.saturating_add(1);
            debug!("Execution {} is {}, next check in {:?}", handle, state, delay);

            tokio::select! {
                biased;

                _ = cancel.cancelled() => return Err(RelayError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// One state check with a single immediate retry.
    async fn check_state(&self, handle: &ExecutionHandle) -> Result<ExecutionState> {
        match self.service.get_execution_state(handle).await {
            Ok(state) => Ok(state),
            Err(first) => {
                warn!("State check for {} failed, retrying once: {}", handle, first);
                self.service
                    .get_execution_state(handle)
                    .await
                    .map_err(|e| match e {
                        RelayError::Poll(_) => e,
                        other => RelayError::poll(other.to_string()),
                    })
            }
        }
    }

    /// Fetches the first page of results. Only valid after SUCCEEDED.
    pub async fn fetch_results(&self, handle: &ExecutionHandle) -> Result<ResultSet> {
        let results = self
            .service
            .get_results(handle)
            .await
            .map_err(|e| match e {
                RelayError::Fetch(_) => e,
                other => RelayError::fetch(other.to_string()),
            })?;

        debug!("Fetched {} rows for {}", results.row_count(), handle);
        Ok(results)
    }

    /// Runs a query to completion and returns its rows.
    pub async fn run_query(&self, request: &QueryRequest, policy: &PollPolicy) -> Result<ResultSet> {
        self.run_query_with_cancel(request, policy, &CancellationToken::new())
            .await
    }

    /// Runs a query to completion unless `cancel` fires first.
    pub async fn run_query_with_cancel(
        &self,
        request: &QueryRequest,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<ResultSet> {
        let handle = self.submit(request).await?;
        let state = self
            .await_terminal_with_cancel(&handle, policy, cancel)
            .await?;

        match state {
            ExecutionState::Succeeded => self.fetch_results(&handle).await,
            state => Err(RelayError::QueryExecution { state }),
        }
    }
}
