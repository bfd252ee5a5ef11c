use std::path::Path;

use crate::cli::context::CliContext;
use crate::cli::output::{emit, OutputFormat};
use crate::config::Config;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde_json::Value as JsonValue;
use tokio::fs;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Get one configuration value by dotted key (e.g. sweep.attempt_budget)
    Get {
        /// Configuration key
        key: String,
    },

    /// Validate the configuration file
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let path = ctx.config_path();
    match args.action {
        ConfigAction::Show => {
            emit(&output, ctx.config(), |config| {
                let body = serde_yaml::to_string(config).unwrap_or_default();
                format!("Effective configuration ({}):\n{}", path.display(), body)
            })?;
        }
        ConfigAction::Get { key } => {
            let json = serde_json::to_value(ctx.config())?;
            let segments = split_key(&key)?;
            match get_json_value(&json, &segments) {
                Some(value) => emit(&output, value, |value| match value {
                    JsonValue::String(text) => text.clone(),
                    other => other.to_string(),
                })?,
                None => bail!("{} not found in configuration", key),
            }
        }
        ConfigAction::Validate => validate_file(path).await?,
    }

    Ok(())
}

async fn validate_file(path: &Path) -> Result<()> {
    if fs::try_exists(path).await? {
        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let config = serde_yaml::from_str::<Config>(&raw)
            .with_context(|| format!("parsing {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("validating {}", path.display()))?;
        println!("Configuration file {} is valid", path.display());
    } else {
        println!(
            "No configuration file at {}; defaults are valid",
            path.display()
        );
    }
    Ok(())
}

fn split_key(key: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = key
        .split('.')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        bail!("configuration key cannot be empty");
    }
    Ok(segments)
}

fn get_json_value<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let mut current = value;
    for segment in path {
        match current {
            JsonValue::Object(map) => {
                current = map.get(*segment)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_keys() {
        let doc = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(
            get_json_value(&doc, &["sweep", "attempt_budget"]),
            Some(&json!(2_850))
        );
        assert_eq!(
            get_json_value(&doc, &["site", "scroll_step_px"]),
            Some(&json!(500.0))
        );
        assert!(get_json_value(&doc, &["sweep", "attempt_budget", "x"]).is_none());
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(split_key("..").is_err());
        assert_eq!(split_key("tempo.seed").unwrap(), vec!["tempo", "seed"]);
    }
}
