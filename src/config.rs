//! Configuration loading
//!
//! Handles loading configuration from embedded defaults, files, and environment.

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use toonledger_cost::TrackerConfig;

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Cost tracker settings, including the pricing table
    #[serde(default)]
    pub tracker: TrackerConfig,
}

/// Load configuration from files and environment
///
/// `extra` is layered above `config/local.toml` and below the environment.
pub fn load_config(extra: Option<&Path>) -> Result<AppConfig> {
    load_layers(extra, true)
}

fn load_layers(extra: Option<&Path>, with_env: bool) -> Result<AppConfig> {
    let mut builder = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. Local overrides (optional)
        .add_source(File::with_name("config/local").required(false));

    if let Some(path) = extra {
        builder = builder.add_source(File::from(path).required(true));
    }

    // 3. Environment variables (highest priority)
    // prefix_separator("_") makes TOONLEDGER_TRACKER__BUDGET_USD work with a
    // single underscore after the prefix.
    if with_env {
        builder = builder.add_source(
            Environment::with_prefix("TOONLEDGER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
    }

    let config: AppConfig = builder
        .build()
        .context("Failed to build configuration")?
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    config
        .tracker
        .validate()
        .context("Invalid tracker configuration")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use toonledger_cost::{default_pricing, PricingModel};

    #[test]
    fn test_embedded_defaults_match_builtin_pricing() {
        let config = load_layers(None, false).unwrap();

        assert_eq!(config.tracker.budget_usd, 50.0);
        assert_eq!(config.tracker.warn_percent, 80.0);
        assert!(config.tracker.snapshot_enabled);
        assert_eq!(
            config.tracker.snapshot_path,
            std::path::PathBuf::from("reports/live_cost.json")
        );
        assert_eq!(config.tracker.pricing.fallback_cost_usd, 0.05);
        assert_eq!(config.tracker.pricing.batch_discount, 0.5);
        assert_eq!(config.tracker.pricing.models, default_pricing());
    }

    #[test]
    fn test_override_file_layers_over_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("override.toml");
        std::fs::write(
            &path,
            r#"
[tracker]
session_id = "episode-7"
budget_usd = 12.5
snapshot_enabled = false
"#,
        )
        .unwrap();

        let config = load_layers(Some(&path), false).unwrap();

        assert_eq!(config.tracker.session_id.as_deref(), Some("episode-7"));
        assert_eq!(config.tracker.budget_usd, 12.5);
        assert!(!config.tracker.snapshot_enabled);
        // Untouched sections keep their defaults
        assert_eq!(config.tracker.pricing.models.len(), 5);
    }

    #[test]
    fn test_override_file_adjusts_pricing_scalars() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pricing.toml");
        std::fs::write(
            &path,
            "[tracker.pricing]\nbatch_discount = 0.25\nfallback_cost_usd = 0.1\n",
        )
        .unwrap();

        let config = load_layers(Some(&path), false).unwrap();
        let pricing = &config.tracker.pricing;

        assert_eq!(pricing.batch_discount, 0.25);
        assert_eq!(pricing.fallback_cost_usd, 0.1);
        assert_eq!(
            pricing.models[4].price,
            PricingModel::TieredPerMegapixel {
                first_mp: 0.03,
                additional_mp_rate: 0.015
            }
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[tracker]\nbudget_usd = -3.0\n").unwrap();

        assert!(load_layers(Some(&path), false).is_err());
    }

    #[test]
    fn test_missing_override_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");

        assert!(load_layers(Some(&path), false).is_err());
    }
}
