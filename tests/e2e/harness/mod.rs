//! E2E test harness for learnvault.
//!
//! This module contains test infrastructure with intentionally unused builders,
//! variants, and methods that will be used as more e2e scenarios are written.

#![allow(dead_code)]

pub mod clock;
pub mod runner;

// Re-export commonly used types
pub use assertions::{Assertion, PreviewMatch, SessionStateMatch};
pub use scenario::Scenario;
