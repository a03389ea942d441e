//! stylemix integration test infrastructure
//!
//! Shared fixtures for the workspace-level tests:
//!
//! - `proptest_bands`: band partition, linearity, and broadcast properties
//! - `e2e_apply`: job files on disk through the CLI command layer
//! - `conditioning`: conditioning extension across all three modes
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p stylemix-tests
//! ```

pub mod fixtures;
