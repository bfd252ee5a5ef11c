use super::config::cmd_config;
use super::env::CliArgs;
use super::owner::cmd_owner;
use super::sweep::cmd_sweep;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Sweep(args) => cmd_sweep(args, ctx, cli.output.clone()).await,
        Commands::Owner(args) => cmd_owner(args, cli.output.clone()),
        Commands::Config(args) => cmd_config(args, ctx, cli.output.clone()).await,
    }
}
