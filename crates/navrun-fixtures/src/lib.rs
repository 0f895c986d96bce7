//! Test utilities and fixtures for navrun integration tests.
//!
//! This crate provides helpers that keep orchestration tests free of
//! real Ansible installations. It includes:
//!
//! - [`RunSpecBuilder`] - Fluent API for constructing run specs
//! - [`StubToolchain`] - Shell stand-ins for the navigator, ansible-playbook
//!   and container engines, installed on a private search path
//! - [`NavigatorStub`] - What the stub navigator writes, prints and returns
//! - [`temp_dir`] - Self-deleting temporary directories
//! - [`TEST_PRIVATE_KEY`] and friends - Key material for secret tests
//!
//! # Example
//!
//! ```ignore
//! use navrun_fixtures::{temp_dir, NavigatorStub, RunSpecBuilder, StubToolchain};
//!
//! let toolchain = StubToolchain::new().with_navigator(NavigatorStub::succeeding());
//! let base = temp_dir("runs");
//! let config = toolchain.config(base.path());
//! let spec = RunSpecBuilder::new(&toolchain.work_dir()).build();
//! ```

// Test fixtures crate - relaxed lints for test utilities
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod builders;
pub mod helpers;
pub mod keys;
pub mod toolchain;

// Re-export commonly used items at crate root
pub use builders::RunSpecBuilder;
pub use helpers::{artifact_json, temp_dir, write_json, write_yaml_text};
pub use keys::{
    TEST_ENCRYPTED_PRIVATE_KEY, TEST_KNOWN_HOST, TEST_PEM_EC_PRIVATE_KEY,
    TEST_PEM_ENCRYPTED_PKCS8_PRIVATE_KEY, TEST_PEM_ENCRYPTED_RSA_PRIVATE_KEY,
    TEST_PEM_PKCS8_PRIVATE_KEY, TEST_PEM_RSA_PRIVATE_KEY, TEST_PRIVATE_KEY,
};
pub use toolchain::{NavigatorStub, StubToolchain, UNSET};
