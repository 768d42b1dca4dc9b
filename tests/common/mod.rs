//! Common test utilities for the harness integration tests
//!
//! `mock` hosts an in-process stand-in for the server under test; `suite`
//! gates the live conformance suites on an actual running server.

#![allow(dead_code)] // Different suites use different helpers; silence per-module warnings.
#![allow(unused_imports)] // Some re-exports may not be used in all test modules

pub mod mock;
pub mod suite;

pub use mock::{http_response, sentinel_response, FakeSut, MockBehavior, MockSut};

/// Initialize diagnostic logging once per test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
