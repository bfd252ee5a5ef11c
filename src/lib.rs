//! Timeline sweeper
//!
//! Library half of the `sweeper` binary, exposed for integration testing.

pub mod cli;
pub mod config;
pub mod metrics;

pub use config::{Config, ConfigError};
