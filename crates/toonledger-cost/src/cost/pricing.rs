//! Model Pricing - image generation billing models
//!
//! This module contains the pricing table and the resolver that turns a
//! model identifier and image dimensions into a cost in USD.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::record::ImageDimensions;

// ============================================================================
// Constants
// ============================================================================

/// Flat cost (USD) charged for models missing from the pricing table
pub const DEFAULT_FALLBACK_COST: f64 = 0.05;

/// Multiplier applied to flat and per-megapixel prices for batch calls
pub const DEFAULT_BATCH_DISCOUNT: f64 = 0.5;

/// Pixels per billed megapixel
pub const PIXELS_PER_MEGAPIXEL: u64 = 1_000_000;

// Default catalogue (USD)
/// Gemini 3 Pro image preview, per image at 1K-2K
pub const GEMINI_3_PRO_IMAGE_COST: f64 = 0.134;
/// Gemini 3 Pro image preview, per image at 4K
pub const GEMINI_3_PRO_IMAGE_4K_COST: f64 = 0.24;
/// Gemini 2.5 Flash image, per image
pub const GEMINI_FLASH_IMAGE_COST: f64 = 0.039;
/// FLUX.1 Kontext pro, per image
pub const FLUX_KONTEXT_PRO_COST: f64 = 0.04;
/// FLUX.1 dev, per megapixel
pub const FLUX_DEV_MP_RATE: f64 = 0.025;
/// FLUX.2 pro, first megapixel
pub const FLUX_2_PRO_FIRST_MP: f64 = 0.03;
/// FLUX.2 pro, each additional megapixel
pub const FLUX_2_PRO_ADDITIONAL_MP: f64 = 0.015;

// ============================================================================
// Pricing Models
// ============================================================================

/// Billing shape of a model.
///
/// Batch discounts apply to every shape except `TieredPerMegapixel`. The
/// reference price sheet never defined a batch rate for tiered billing, so
/// a tiered call flagged as batch is charged the undiscounted amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingModel {
    /// Fixed cost per image regardless of size
    Flat {
        /// USD per image
        amount: f64,
    },
    /// Fixed cost per image that depends on the resolution class
    FlatByResolution {
        /// USD per 1K or 2K image
        standard: f64,
        /// USD per 4K image
        uhd: f64,
    },
    /// Cost per started megapixel
    PerMegapixel {
        /// USD per megapixel
        rate: f64,
    },
    /// Fixed cost for the first megapixel plus a marginal rate after that
    TieredPerMegapixel {
        /// USD for the first megapixel
        first_mp: f64,
        /// USD for every additional started megapixel
        additional_mp_rate: f64,
    },
}

impl PricingModel {
    /// Undiscounted cost for an image of the given size
    #[must_use]
    pub fn base_cost(&self, dimensions: ImageDimensions) -> f64 {
        let mp = billable_megapixels(dimensions) as f64;
        let cost = match *self {
            Self::Flat { amount } => amount,
            Self::FlatByResolution { standard, uhd } => match dimensions.resolution_class() {
                "4K" => uhd,
                _ => standard,
            },
            Self::PerMegapixel { rate } => mp * rate,
            Self::TieredPerMegapixel {
                first_mp,
                additional_mp_rate,
            } => first_mp + (mp - 1.0).max(0.0) * additional_mp_rate,
        };
        non_negative(cost)
    }

    /// Whether a batch discount applies to this billing shape
    #[must_use]
    pub fn supports_batch_discount(&self) -> bool {
        !matches!(self, Self::TieredPerMegapixel { .. })
    }
}

/// Megapixels billed for an image: started megapixels, never less than one.
///
/// Exactly 1.0 MP bills as 1; 1.000001 MP bills as 2; an empty image bills
/// at the one-megapixel minimum.
#[must_use]
pub fn billable_megapixels(dimensions: ImageDimensions) -> u64 {
    dimensions.pixels().div_ceil(PIXELS_PER_MEGAPIXEL).max(1)
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Pricing entry for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRule {
    /// Model identifier as passed by callers
    pub model: String,
    /// Short display name for dashboards
    #[serde(default)]
    pub short_name: Option<String>,
    /// Billing provider
    #[serde(default)]
    pub platform: Option<String>,
    /// Billing shape
    pub price: PricingModel,
}

impl PricingRule {
    /// Create a rule with no display metadata
    pub fn new(model: impl Into<String>, price: PricingModel) -> Self {
        Self {
            model: model.into(),
            short_name: None,
            platform: None,
            price,
        }
    }

    /// Set the short display name
    #[must_use]
    pub fn with_short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = Some(short_name.into());
        self
    }

    /// Set the billing platform
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }
}

/// Serializable pricing section of the tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Cost used for unknown models
    #[serde(default = "default_fallback_cost")]
    pub fallback_cost_usd: f64,
    /// Batch discount multiplier
    #[serde(default = "default_batch_discount")]
    pub batch_discount: f64,
    /// Per-model rules
    #[serde(default = "default_rules")]
    pub models: Vec<PricingRule>,
}

fn default_fallback_cost() -> f64 {
    DEFAULT_FALLBACK_COST
}

fn default_batch_discount() -> f64 {
    DEFAULT_BATCH_DISCOUNT
}

fn default_rules() -> Vec<PricingRule> {
    default_pricing()
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            fallback_cost_usd: DEFAULT_FALLBACK_COST,
            batch_discount: DEFAULT_BATCH_DISCOUNT,
            models: default_pricing(),
        }
    }
}

// ============================================================================
// Pricing Table
// ============================================================================

/// Immutable model → price lookup used by the tracker
#[derive(Debug, Clone)]
pub struct PricingTable {
    rules: HashMap<String, PricingRule>,
    fallback_cost: f64,
    batch_discount: f64,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::from_config(&PricingConfig::default())
    }
}

impl PricingTable {
    /// Start an empty table
    pub fn builder() -> PricingTableBuilder {
        PricingTableBuilder::new()
    }

    /// Build a table from its configuration form.
    ///
    /// Negative or non-finite amounts are clamped to zero and the batch
    /// discount is clamped into `0.0..=1.0`.
    #[must_use]
    pub fn from_config(config: &PricingConfig) -> Self {
        config
            .models
            .iter()
            .cloned()
            .fold(PricingTableBuilder::new(), PricingTableBuilder::rule)
            .fallback_cost(config.fallback_cost_usd)
            .batch_discount(config.batch_discount)
            .build()
    }

    /// Resolve the cost of one call.
    ///
    /// Unknown models are charged the fallback flat cost. Never negative.
    #[must_use]
    pub fn resolve(&self, model: &str, dimensions: ImageDimensions, is_batch: bool) -> f64 {
        let (cost, discountable) = match self.rules.get(model) {
            Some(rule) => (
                rule.price.base_cost(dimensions),
                rule.price.supports_batch_discount(),
            ),
            None => (self.fallback_cost, true),
        };

        if is_batch && discountable {
            cost * self.batch_discount
        } else {
            cost
        }
    }

    /// Rule for a model, if configured
    pub fn rule(&self, model: &str) -> Option<&PricingRule> {
        self.rules.get(model)
    }

    /// Whether the model has an explicit price
    pub fn contains(&self, model: &str) -> bool {
        self.rules.contains_key(model)
    }

    /// Display name: the configured short name, else the last path segment
    pub fn short_name<'a>(&'a self, model: &'a str) -> &'a str {
        self.rules
            .get(model)
            .and_then(|r| r.short_name.as_deref())
            .unwrap_or_else(|| model.rsplit('/').next().unwrap_or(model))
    }

    /// Configured billing platform for a model
    pub fn platform(&self, model: &str) -> Option<&str> {
        self.rules.get(model).and_then(|r| r.platform.as_deref())
    }

    /// Cost charged for unknown models
    pub fn fallback_cost(&self) -> f64 {
        self.fallback_cost
    }

    /// Batch discount multiplier
    pub fn batch_discount(&self) -> f64 {
        self.batch_discount
    }

    /// All rules, sorted by model id
    pub fn rules(&self) -> Vec<&PricingRule> {
        let mut rules: Vec<_> = self.rules.values().collect();
        rules.sort_by(|a, b| a.model.cmp(&b.model));
        rules
    }
}

/// Builder for [`PricingTable`]
#[derive(Debug, Default)]
pub struct PricingTableBuilder {
    rules: HashMap<String, PricingRule>,
    fallback_cost: Option<f64>,
    batch_discount: Option<f64>,
}

impl PricingTableBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the default catalogue
    #[must_use]
    pub fn with_defaults(self) -> Self {
        default_pricing().into_iter().fold(self, Self::rule)
    }

    /// Add or replace a rule
    #[must_use]
    pub fn rule(mut self, rule: PricingRule) -> Self {
        self.rules.insert(rule.model.clone(), rule);
        self
    }

    /// Flat price per image
    #[must_use]
    pub fn flat(self, model: impl Into<String>, amount: f64) -> Self {
        self.rule(PricingRule::new(model, PricingModel::Flat { amount }))
    }

    /// Price per started megapixel
    #[must_use]
    pub fn per_megapixel(self, model: impl Into<String>, rate: f64) -> Self {
        self.rule(PricingRule::new(model, PricingModel::PerMegapixel { rate }))
    }

    /// First megapixel plus marginal rate
    #[must_use]
    pub fn tiered(self, model: impl Into<String>, first_mp: f64, additional_mp_rate: f64) -> Self {
        self.rule(PricingRule::new(
            model,
            PricingModel::TieredPerMegapixel {
                first_mp,
                additional_mp_rate,
            },
        ))
    }

    /// Override the unknown-model cost
    #[must_use]
    pub fn fallback_cost(mut self, cost: f64) -> Self {
        self.fallback_cost = Some(cost);
        self
    }

    /// Override the batch discount multiplier
    #[must_use]
    pub fn batch_discount(mut self, discount: f64) -> Self {
        self.batch_discount = Some(discount);
        self
    }

    /// Finish the table
    pub fn build(self) -> PricingTable {
        let fallback_cost = non_negative(self.fallback_cost.unwrap_or(DEFAULT_FALLBACK_COST));
        let batch_discount = self
            .batch_discount
            .filter(|d| d.is_finite())
            .unwrap_or(DEFAULT_BATCH_DISCOUNT)
            .clamp(0.0, 1.0);

        PricingTable {
            rules: self.rules,
            fallback_cost,
            batch_discount,
        }
    }
}

/// Default pricing for the image models the pipeline uses
#[must_use]
pub fn default_pricing() -> Vec<PricingRule> {
    vec![
        PricingRule::new(
            "gemini-3-pro-image-preview",
            PricingModel::FlatByResolution {
                standard: GEMINI_3_PRO_IMAGE_COST,
                uhd: GEMINI_3_PRO_IMAGE_4K_COST,
            },
        )
        .with_short_name("gemini-3-pro")
        .with_platform("google"),
        PricingRule::new(
            "gemini-2.5-flash-image",
            PricingModel::Flat {
                amount: GEMINI_FLASH_IMAGE_COST,
            },
        )
        .with_short_name("gemini-flash")
        .with_platform("google"),
        PricingRule::new(
            "fal-ai/flux-pro/kontext",
            PricingModel::Flat {
                amount: FLUX_KONTEXT_PRO_COST,
            },
        )
        .with_short_name("kontext")
        .with_platform("fal"),
        PricingRule::new(
            "fal-ai/flux/dev",
            PricingModel::PerMegapixel {
                rate: FLUX_DEV_MP_RATE,
            },
        )
        .with_short_name("flux-dev")
        .with_platform("fal"),
        PricingRule::new(
            "fal-ai/flux-2-pro",
            PricingModel::TieredPerMegapixel {
                first_mp: FLUX_2_PRO_FIRST_MP,
                additional_mp_rate: FLUX_2_PRO_ADDITIONAL_MP,
            },
        )
        .with_short_name("flux-2-pro")
        .with_platform("fal"),
    ]
}
