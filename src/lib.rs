//! XML editor acceptance-test harness
//!
//! Indexes a fixture store whose folder names encode expected validation
//! error counts, drives each fixture through a validator gateway and
//! reconciles what the editor reported with what the folder promised.

pub mod cli;
pub mod commands;
pub mod common;
pub mod gateway;
pub mod harness;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use gateway::{Outcome, ValidatorGateway};
pub use harness::{Manifest, Verdict};
