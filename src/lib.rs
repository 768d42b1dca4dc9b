//! Black-box conformance test harness for an HTTP server under test.
//!
//! The harness renders a configuration from a placeholder template, makes the
//! server under test reload it, waits until the new configuration is actually
//! serving traffic, then issues requests over a structured client or a raw
//! byte-level transport and checks the captured responses.

pub mod case;
pub mod client;
pub mod error;
pub mod fixture;
pub mod logger;
pub mod raw;
pub mod server;
pub mod settings;
pub mod template;

pub use case::{Expect, RawExpect, Step, TestCase};
pub use client::{CapturedResponse, StructuredClient};
pub use error::HarnessError;
pub use fixture::{DeniedDir, Fixture};
pub use raw::RawClient;
pub use server::{ServerController, ServerHandle};
pub use settings::Settings;
pub use template::{Bindings, ConfigTemplate};

// Re-export so test code can name methods without depending on reqwest directly.
pub use reqwest::Method;
