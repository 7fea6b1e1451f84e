//! # Alarm Testing Utils
//!
//! Shared testing utilities for the alarm dispatch workspace.
//! This crate provides in-memory authorities, test data builders and
//! testing helpers that can be used across all other crates in the workspace.
//!
//! ## Features
//!
//! - **Mock Authorities**: In-memory operation, dispositioning and catalog services
//!   with call counters and injectable failures
//! - **Mock Connector**: Binding factory over the mock authorities
//! - **Test Data Builders**: Utilities for creating operations and catalog resources
//! - **Helpers**: Polling waits and logging setup
//!
//! ## Usage
//!
//! ```toml
//! [dev-dependencies]
//! alarm-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
