//! Common test utilities for pipeline integration tests
//!
//! Fixture writers produce small PatentsView-shaped input files; the flaky
//! store wraps a real store and injects failures and delays.

#![allow(dead_code)]

pub mod fixtures;
pub mod flaky;

pub use fixtures::{FixtureSet, PatentRow};
pub use flaky::{FaultPlan, FlakyStore};
