//! athena-relay - A thin HTTP relay in front of Amazon Athena.
//!
//! This library exposes the query lifecycle, the service backends and the
//! HTTP layer for use by the binary and integration tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod query;
pub mod service;
