//! Query service abstraction for athena-relay.
//!
//! The relay depends only on a narrow contract with the remote engine:
//! start an execution, read its state, read its results. Backends implement
//! [`QueryService`] and can be swapped freely.

mod athena;
mod mock;
mod types;

pub use athena::AthenaQueryService;
pub use mock::{MockQueryService, ScriptedExecution};
pub use types::{ExecutionHandle, ExecutionState, QueryRequest, ResultSet};

use std::sync::Arc;

use crate::config::AthenaConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Creates the Athena-backed query service from configuration.
///
/// This is the central factory for the production backend.
pub async fn connect(config: &AthenaConfig) -> Result<Arc<dyn QueryService>> {
    let service = AthenaQueryService::connect(config).await?;
    Ok(Arc::new(service))
}

/// Trait defining the interface to a remote query engine.
///
/// Implementations must be thread-safe; one instance is shared by every
/// concurrent query lifecycle.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Starts an asynchronous execution and returns its handle.
    async fn start_execution(&self, request: &QueryRequest) -> Result<ExecutionHandle>;

    /// Reads the current state of an execution.
    async fn get_execution_state(&self, handle: &ExecutionHandle) -> Result<ExecutionState>;

    /// Reads the first page of results of a succeeded execution.
    async fn get_results(&self, handle: &ExecutionHandle) -> Result<ResultSet>;

    /// Asks the service to stop an execution. Best effort.
    async fn stop_execution(&self, handle: &ExecutionHandle) -> Result<()> {
        let _ = handle;
        Ok(())
    }
}
