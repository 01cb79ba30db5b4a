//! Tracker configuration
//!
//! Deserializable from the `[tracker]` section (pricing under
//! `[tracker.pricing]`) of the application config.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::pricing::PricingConfig;
use super::snapshot::DEFAULT_SNAPSHOT_PATH;
use crate::error::{Error, Result};

/// Session budget (USD) when none is configured
pub const DEFAULT_BUDGET_USD: f64 = 50.0;

/// Percentage of the budget at which a warning is logged
pub const DEFAULT_WARN_PERCENT: f64 = 80.0;

/// Configuration for a [`CostTracker`](super::CostTracker)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Fixed session id; generated from the start time when absent
    #[serde(default)]
    pub session_id: Option<String>,
    /// Advisory budget for the session (USD); 0 means no budget
    #[serde(default = "default_budget")]
    pub budget_usd: f64,
    /// Warning threshold as a percentage of the budget
    #[serde(default = "default_warn_percent")]
    pub warn_percent: f64,
    /// Write the live snapshot after every call
    #[serde(default = "default_true")]
    pub snapshot_enabled: bool,
    /// Live snapshot location
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    /// Pricing table
    #[serde(default)]
    pub pricing: PricingConfig,
}

fn default_budget() -> f64 {
    DEFAULT_BUDGET_USD
}

fn default_warn_percent() -> f64 {
    DEFAULT_WARN_PERCENT
}

fn default_true() -> bool {
    true
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from(DEFAULT_SNAPSHOT_PATH)
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            session_id: None,
            budget_usd: DEFAULT_BUDGET_USD,
            warn_percent: DEFAULT_WARN_PERCENT,
            snapshot_enabled: true,
            snapshot_path: default_snapshot_path(),
            pricing: PricingConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Set the session id
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the budget
    #[must_use]
    pub fn with_budget(mut self, budget_usd: f64) -> Self {
        self.budget_usd = budget_usd;
        self
    }

    /// Write snapshots to `path`
    #[must_use]
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_enabled = true;
        self.snapshot_path = path.into();
        self
    }

    /// Keep everything in memory
    #[must_use]
    pub fn without_snapshot(mut self) -> Self {
        self.snapshot_enabled = false;
        self
    }

    /// Replace the pricing section
    #[must_use]
    pub fn with_pricing(mut self, pricing: PricingConfig) -> Self {
        self.pricing = pricing;
        self
    }

    /// Reject values the tracker would otherwise silently clamp.
    ///
    /// The tracker itself accepts any config; this is for loaders that want
    /// to surface mistakes early.
    pub fn validate(&self) -> Result<()> {
        if !self.budget_usd.is_finite() || self.budget_usd < 0.0 {
            return Err(Error::Config(format!(
                "budget_usd must be a non-negative number, got {}",
                self.budget_usd
            )));
        }
        if !(0.0..=1.0).contains(&self.pricing.batch_discount) {
            return Err(Error::Config(format!(
                "pricing.batch_discount must be within 0.0..=1.0, got {}",
                self.pricing.batch_discount
            )));
        }
        if !self.pricing.fallback_cost_usd.is_finite() || self.pricing.fallback_cost_usd < 0.0 {
            return Err(Error::Config(format!(
                "pricing.fallback_cost_usd must be non-negative, got {}",
                self.pricing.fallback_cost_usd
            )));
        }
        if let Some(rule) = self
            .pricing
            .models
            .iter()
            .find(|r| r.model.trim().is_empty())
        {
            return Err(Error::Config(format!(
                "pricing rule with empty model id: {:?}",
                rule.price
            )));
        }
        Ok(())
    }
}
