//! Amazon Athena query service implementation.
//!
//! Provides the `AthenaQueryService` struct that implements the `QueryService`
//! trait on top of the AWS SDK. Credentials come from the standard AWS
//! provider chain (environment, profile, instance role); none are stored here.

use crate::config::AthenaConfig;
use crate::error::{RelayError, Result};
use crate::service::{ExecutionHandle, ExecutionState, QueryRequest, QueryService, ResultSet};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_athena::config::Region;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{QueryExecutionContext, ResultConfiguration};
use aws_sdk_athena::Client;
use tracing::{debug, info};

/// Athena-backed query service.
#[derive(Debug, Clone)]
pub struct AthenaQueryService {
    client: Client,
    workgroup: Option<String>,
}

impl AthenaQueryService {
    /// Creates a service from an already configured SDK client.
    ///
    /// This is primarily useful for testing against a local endpoint.
    pub fn from_client(client: Client, workgroup: Option<String>) -> Self {
        Self { client, workgroup }
    }

    /// Loads AWS configuration and builds the client.
    pub async fn connect(config: &AthenaConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        let region = sdk_config.region().ok_or_else(|| {
            RelayError::config("No AWS region configured. Set [athena].region or AWS_REGION")
        })?;
        debug!("Athena client configured for region {}", region);

        Ok(Self::from_client(
            Client::new(&sdk_config),
            config.workgroup.clone(),
        ))
    }
}

#[async_trait]
impl QueryService for AthenaQueryService {
    async fn start_execution(&self, request: &QueryRequest) -> Result<ExecutionHandle> {
        let context = QueryExecutionContext::builder()
            .database(&request.database)
            .build();
        let result_config = ResultConfiguration::builder()
            .output_location(&request.output_location)
            .build();

        let output = self
            .client
            .start_query_execution()
            .query_string(&request.sql)
            .query_execution_context(context)
            .result_configuration(result_config)
            .set_work_group(self.workgroup.clone())
            .send()
            .await
            .map_err(|e| {
                RelayError::submission(format!(
                    "Athena rejected the query: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        let id = output
            .query_execution_id()
            .ok_or_else(|| RelayError::submission("Athena returned no query execution id"))?;

        info!("Started Athena execution {} on {}", id, request.database);
        Ok(ExecutionHandle::new(id))
    }

    async fn get_execution_state(&self, handle: &ExecutionHandle) -> Result<ExecutionState> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(handle.as_str())
            .send()
            .await
            .map_err(|e| {
                RelayError::poll(format!(
                    "Failed to read state of {}: {}",
                    handle,
                    DisplayErrorContext(&e)
                ))
            })?;

        let status = output
            .query_execution()
            .and_then(|execution| execution.status())
            .ok_or_else(|| RelayError::poll(format!("Athena reported no status for {}", handle)))?;

        let raw_state = status
            .state()
            .ok_or_else(|| RelayError::poll(format!("Athena reported no state for {}", handle)))?;

        let state = ExecutionState::parse(raw_state.as_str()).ok_or_else(|| {
            RelayError::poll(format!(
                "Unrecognized execution state '{}' for {}",
                raw_state.as_str(),
                handle
            ))
        })?;

        if let Some(reason) = status.state_change_reason() {
            debug!("Execution {} is {}: {}", handle, state, reason);
        }

        Ok(state)
    }

    async fn get_results(&self, handle: &ExecutionHandle) -> Result<ResultSet> {
        let output = self
            .client
            .get_query_results()
            .query_execution_id(handle.as_str())
            .send()
            .await
            .map_err(|e| {
                RelayError::fetch(format!(
                    "Failed to read results of {}: {}",
                    handle,
                    DisplayErrorContext(&e)
                ))
            })?;

        if output.next_token().is_some() {
            debug!("Execution {} has more result pages; returning the first", handle);
        }

        // Absent VarCharValue means SQL NULL.
        let rows: Vec<Vec<String>> = output
            .result_set()
            .map(|result_set| {
                result_set
                    .rows()
                    .iter()
                    .map(|row| {
                        row.data()
                            .iter()
                            .map(|datum| datum.var_char_value().unwrap_or_default().to_string())
                            .collect()
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ResultSet::new(rows))
    }

    async fn stop_execution(&self, handle: &ExecutionHandle) -> Result<()> {
        self.client
            .stop_query_execution()
            .query_execution_id(handle.as_str())
            .send()
            .await
            .map_err(|e| {
                RelayError::internal(format!(
                    "Failed to stop {}: {}",
                    handle,
                    DisplayErrorContext(&e)
                ))
            })?;

        info!("Requested stop of Athena execution {}", handle);
        Ok(())
    }
}
