use std::env;
use std::fs as stdfs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

pub fn load_local_env_overrides() {
    load_env_file(Path::new("config/local.env"));
}

fn load_env_file(path: &Path) {
    if !path.exists() {
        return;
    }

    match stdfs::read_to_string(path) {
        Ok(contents) => {
            for (idx, raw_line) in contents.lines().enumerate() {
                let line = raw_line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let Some((key, value)) = line.split_once('=') else {
                    warn!(line = idx + 1, "invalid local.env entry; skipping");
                    continue;
                };
                let key = key.trim();
                if key.is_empty() || env::var(key).is_ok() {
                    continue;
                }
                env::set_var(key, unescape_value(value.trim()));
            }
            info!(path = %path.display(), "Loaded environment overrides from local.env");
        }
        Err(err) => {
            warn!(path = %path.display(), ?err, "failed to read local.env overrides");
        }
    }
}

/// Installs the global subscriber. Logs go to stderr so command output stays parseable.
///
/// `RUST_LOG` wins over `level`; `SWEEPER_LOG_JSON=1` switches to JSON lines.
pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    let registry = tracing_subscriber::registry().with(filter);
    if json_logs_requested() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn json_logs_requested() -> bool {
    env::var("SWEEPER_LOG_JSON")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
}

/// Default lookup: `./config/sweeper.yaml`, then `<config dir>/sweeper/config.yaml`.
pub fn default_config_path() -> Result<PathBuf> {
    let local_config = PathBuf::from("config/sweeper.yaml");
    if local_config.exists() {
        return Ok(local_config);
    }
    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push("sweeper");
    path.push("config.yaml");
    Ok(path)
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let (config_path, explicit) = match config_path {
        Some(path) => (path.clone(), true),
        None => (default_config_path()?, false),
    };

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;

        info!("Loaded configuration from: {}", config_path.display());
        Ok(LoadedConfig {
            config,
            path: config_path,
        })
    } else if explicit {
        bail!("config file {} does not exist", config_path.display())
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        Ok(LoadedConfig {
            config: Config::default(),
            path: config_path,
        })
    }
}

fn unescape_value(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        let inner = &value[1..value.len() - 1];
        inner
            .replace("\\\"", "\"")
            .replace("\\n", "\n")
            .replace("\\r", "\r")
            .replace("\\t", "\t")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[tokio::test]
    async fn loads_explicit_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sweeper.yaml");
        stdfs::write(&path, "sweep:\n  no_progress_budget: 7\n").unwrap();

        let loaded = load_config(Some(&path)).await.unwrap();
        assert_eq!(loaded.path, path);
        assert_eq!(loaded.config.sweep.no_progress_budget, 7);
        assert_eq!(loaded.config.sweep.attempt_budget, 2_850);
    }

    #[tokio::test]
    async fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        assert!(load_config(Some(&path)).await.is_err());
    }

    #[tokio::test]
    async fn invalid_values_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sweeper.yaml");
        stdfs::write(&path, "site:\n  delete_labels: []\n").unwrap();

        let err = load_config(Some(&path)).await.err().expect("invalid config");
        assert!(format!("{err:#}").contains("delete_labels"));
    }

    #[test]
    #[serial]
    fn env_file_does_not_override_existing_vars() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("local.env");
        stdfs::write(
            &path,
            "# comment\nSWEEPER_TEST_FRESH=\"a\\tb\"\nSWEEPER_TEST_SET=from-file\nbroken line\n",
        )
        .unwrap();
        env::remove_var("SWEEPER_TEST_FRESH");
        env::set_var("SWEEPER_TEST_SET", "from-env");

        load_env_file(&path);

        assert_eq!(env::var("SWEEPER_TEST_FRESH").unwrap(), "a\tb");
        assert_eq!(env::var("SWEEPER_TEST_SET").unwrap(), "from-env");
        env::remove_var("SWEEPER_TEST_FRESH");
        env::remove_var("SWEEPER_TEST_SET");
    }
}
