pub mod app;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod owner;
pub mod runtime;
pub mod sweep;

pub use config::{cmd_config, ConfigArgs};
pub use owner::{cmd_owner, OwnerArgs};
pub use sweep::{cmd_sweep, SweepArgs};
