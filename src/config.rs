//! Application configuration
//!
//! One YAML document with four sections: `browser` (Chromium launch), `sweep` (budgets),
//! `tempo` (settle pauses) and `site` (selectors and labels). Every field is optional.

use action_primitives::{DeleteIntent, SiteProfile, Tempo};
use cdp_adapter::CdpConfig;
use serde::{Deserialize, Serialize};
use sweep_loop::SweepConfig;
use thiserror::Error;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: CdpConfig,
    pub sweep: SweepConfig,
    pub tempo: Tempo,
    pub site: SiteProfile,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("site.delete_labels must contain at least one non-empty label")]
    NoDeleteLabels,

    #[error("site.{0} selector is empty")]
    EmptySelector(&'static str),

    #[error("invalid scroll steps: {0}")]
    InvalidSteps(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let site = &self.site;
        let selectors = [
            ("content_unit", &site.content_unit),
            ("author_link", &site.author_link),
            ("menu_trigger", &site.menu_trigger),
            ("menu_item", &site.menu_item),
            ("confirm_button", &site.confirm_button),
            ("clickable", &site.clickable),
            ("container_marker", &site.container_marker),
        ];
        if let Some((name, _)) = selectors.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::EmptySelector(*name));
        }

        let steps = &site.steps;
        if !(steps.scroll_step_px > 0.0 && steps.min_step_px > 0.0 && steps.max_step_px > 0.0) {
            return Err(ConfigError::InvalidSteps(format!(
                "all steps must be positive (scroll {}, min {}, max {})",
                steps.scroll_step_px, steps.min_step_px, steps.max_step_px
            )));
        }

        self.delete_intent()?;
        Ok(())
    }

    pub fn delete_intent(&self) -> Result<DeleteIntent, ConfigError> {
        DeleteIntent::new(&self.site.delete_labels).map_err(|_| ConfigError::NoDeleteLabels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_site_behaviour() {
        let config = Config::default();
        assert_eq!(config.sweep.attempt_budget, 2_850);
        assert_eq!(config.sweep.no_progress_budget, 20);
        assert_eq!(config.sweep.startup_delay_ms, 4_000);
        assert!(config.sweep.declutter);
        assert_eq!(config.tempo.post_delete_ms, 1_000);
        assert_eq!(config.site.container_marker, "cellInnerDiv");
        assert_eq!(config.site.steps.scroll_step_px, 500.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn yaml_overrides_are_partial() {
        let raw = r#"
sweep:
  attempt_budget: 10
tempo:
  jitter_min_ms: 5
  jitter_max_ms: 10
site:
  delete_labels: ["Eliminar"]
  scroll_step_px: 300
"#;
        let config: Config = serde_yaml::from_str(raw).unwrap();
        assert_eq!(config.sweep.attempt_budget, 10);
        assert_eq!(config.sweep.no_progress_budget, 20);
        assert_eq!(config.tempo.jitter_max_ms, 10);
        assert_eq!(config.tempo.scroll_settle_ms, 1_200);
        assert_eq!(config.site.steps.scroll_step_px, 300.0);
        assert_eq!(config.site.steps.max_step_px, 1_200.0);
        assert!(config.delete_intent().unwrap().matches("ELIMINAR post"));
    }

    #[test]
    fn rejects_blank_labels_and_selectors() {
        let mut config = Config::default();
        config.site.delete_labels = vec!["  ".into()];
        assert_eq!(config.validate(), Err(ConfigError::NoDeleteLabels));

        let mut config = Config::default();
        config.site.menu_trigger = String::new();
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptySelector("menu_trigger"))
        );

        let mut config = Config::default();
        config.site.steps.min_step_px = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSteps(_))
        ));
    }
}
