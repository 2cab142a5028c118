//! Shared test utilities for sterilog integration tests.
//!
//! - `ReportBuilder` produces autoclave exports as the devices write them
//! - `TestHarness` runs a full `Sterilog` inside a temp directory

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
