//! Integration and unit tests for DriveHub.
//!
//! ## Test Modules
//!
//! - **support**: in-memory drive provider and test application fixtures
//! - **tree_tests**: recursive tree construction for one credential
//! - **aggregate_tests**: multi-credential fan-out and failure isolation
//! - **provider_http_tests**: HTTP client against a local fake provider
//! - **drives_api_tests**: drive endpoints
//! - **credentials_api_tests**: credential management endpoints
//! - **health_api_tests**: health, metrics and version endpoints
//! - **store_tests**: SQLite credential and session stores
//! - **config_tests**: configuration layering and validation
//! - **error_tests**: error responses and request validation
//!
//! Individual modules can be run with e.g. `cargo test tree_tests`.

pub mod support;

pub mod provider_http_tests;
