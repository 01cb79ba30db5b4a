//! CLI command: `toonledger quote`
//!
//! Prices one call against the configured table without recording it.

use serde::Serialize;
use toonledger_cost::{
    billable_megapixels, round_currency, ImageDimensions, PricingTable, UNKNOWN_PLATFORM,
};

use super::pricing::describe_price;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct Quote<'a> {
    model: &'a str,
    short_name: &'a str,
    platform: &'a str,
    dimensions: ImageDimensions,
    billable_megapixels: u64,
    resolution: &'static str,
    is_batch: bool,
    batch_discount_applied: bool,
    priced_by: String,
    cost_usd: f64,
}

/// Run the quote subcommand.
pub fn run(
    config: &AppConfig,
    model: &str,
    width: u32,
    height: u32,
    batch: bool,
    json: bool,
) -> anyhow::Result<()> {
    let table = PricingTable::from_config(&config.tracker.pricing);
    let quote = build_quote(&table, model, ImageDimensions::new(width, height), batch);

    if json {
        println!("{}", serde_json::to_string_pretty(&quote)?);
        return Ok(());
    }

    println!();
    println!("  💰 {} ({}, {})", quote.model, quote.short_name, quote.platform);
    println!(
        "  Size:     {} x {} ({} MP billed, {})",
        quote.dimensions.width,
        quote.dimensions.height,
        quote.billable_megapixels,
        quote.resolution
    );
    println!("  Pricing:  {}", quote.priced_by);
    if quote.is_batch {
        let note = if quote.batch_discount_applied {
            "discount applied"
        } else {
            "no batch rate for this model"
        };
        println!("  Batch:    yes ({note})");
    }
    println!("  Cost:     ${:.4}", quote.cost_usd);
    println!();

    Ok(())
}

fn build_quote<'a>(
    table: &'a PricingTable,
    model: &'a str,
    dimensions: ImageDimensions,
    is_batch: bool,
) -> Quote<'a> {
    let rule = table.rule(model);
    let priced_by = rule
        .map(|r| describe_price(&r.price))
        .unwrap_or_else(|| format!("fallback ${:.4}/image", table.fallback_cost()));
    let discountable = rule.map_or(true, |r| r.price.supports_batch_discount());

    Quote {
        model,
        short_name: table.short_name(model),
        platform: table.platform(model).unwrap_or(UNKNOWN_PLATFORM),
        dimensions,
        billable_megapixels: billable_megapixels(dimensions),
        resolution: dimensions.resolution_class(),
        is_batch,
        batch_discount_applied: is_batch && discountable,
        priced_by,
        cost_usd: round_currency(table.resolve(model, dimensions, is_batch)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PricingTable {
        PricingTable::builder().with_defaults().build()
    }

    #[test]
    fn test_quote_tiered_ignores_batch() {
        let table = table();
        let quote = build_quote(&table, "fal-ai/flux-2-pro", ImageDimensions::new(2048, 2048), true);

        assert_eq!(quote.short_name, "flux-2-pro");
        assert_eq!(quote.platform, "fal");
        assert_eq!(quote.billable_megapixels, 5);
        assert!(!quote.batch_discount_applied);
        assert_eq!(quote.cost_usd, 0.09);
    }

    #[test]
    fn test_quote_flat_batch() {
        let table = table();
        let quote = build_quote(&table, "fal-ai/flux-pro/kontext", ImageDimensions::new(1024, 1024), true);

        assert!(quote.batch_discount_applied);
        assert_eq!(quote.cost_usd, 0.02);
    }

    #[test]
    fn test_quote_unknown_model_uses_fallback() {
        let table = table();
        let quote = build_quote(&table, "vendor/mystery", ImageDimensions::new(512, 512), false);

        assert_eq!(quote.short_name, "mystery");
        assert_eq!(quote.platform, UNKNOWN_PLATFORM);
        assert_eq!(quote.priced_by, "fallback $0.0500/image");
        assert_eq!(quote.cost_usd, 0.05);
    }
}
