//! HTTP API module for athena-relay
//!
//! Provides the GET endpoints for:
//! - Fire-and-forget query submission
//! - Table previews that run a query to completion
//! - Liveness checks

pub mod server;

pub use server::{
    create_server, serve, start_server, AppState, ErrorResponse, ExecuteQueryResponse,
    TableResponse,
};
