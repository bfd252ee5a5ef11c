use action_primitives::detect_owner;
use anyhow::{anyhow, Result};
use clap::Args;
use serde::Serialize;

use super::output::{emit, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct OwnerArgs {
    /// Timeline URL, e.g. https://x.com/yourname
    pub url: String,
}

#[derive(Serialize)]
struct OwnerReport {
    url: String,
    owner: String,
}

pub fn cmd_owner(args: OwnerArgs, output: OutputFormat) -> Result<()> {
    let owner = detect_owner(&args.url)
        .ok_or_else(|| anyhow!("no timeline owner in '{}'", args.url))?;
    let report = OwnerReport {
        url: args.url,
        owner: owner.to_string(),
    };
    emit(&output, &report, |report| report.owner.clone())
}
