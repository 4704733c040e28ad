//! Integration tests for athena-relay.
//!
//! The Athena tests are skipped unless ATHENA_TEST_DATABASE and
//! ATHENA_TEST_OUTPUT_LOCATION are set.

pub mod athena_test;
pub mod config_test;
pub mod http_test;
