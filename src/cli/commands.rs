use clap::Subcommand;

use super::config::ConfigArgs;
use super::owner::OwnerArgs;
use super::sweep::SweepArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Delete your own posts from a timeline open in Chromium
    Sweep(SweepArgs),

    /// Print the timeline owner derived from a URL
    Owner(OwnerArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),
}
