//! Shared test utilities for mediaconv integration tests.
//!
//! - `TestHarness`: temp store/staging directories plus an in-memory database
//! - `ScriptedConverter`: an in-process converter with a configurable catalog,
//!   per-variant failures and a gate for holding conversions in flight

pub mod harness;

pub use harness::{cookies, variant, ScriptedConverter, TestHarness};
