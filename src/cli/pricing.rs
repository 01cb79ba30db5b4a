//! CLI command: `toonledger pricing`
//!
//! Lists every configured model with its billing shape.

use toonledger_cost::{PricingModel, PricingTable};

use crate::config::AppConfig;

/// Run the pricing subcommand.
pub fn run(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let table = PricingTable::from_config(&config.tracker.pricing);

    if json {
        let output = serde_json::json!({
            "fallback_cost_usd": table.fallback_cost(),
            "batch_discount": table.batch_discount(),
            "models": table.rules(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("  Image Model Pricing");
    println!("  {}", "-".repeat(78));
    println!(
        "  {:<30} {:<14} {:<8} Price",
        "Model", "Short Name", "Platform"
    );
    println!("  {}", "-".repeat(78));

    let rules = table.rules();
    if rules.is_empty() {
        println!("  (no models configured)");
    }
    for rule in rules {
        println!(
            "  {:<30} {:<14} {:<8} {}",
            rule.model,
            table.short_name(&rule.model),
            rule.platform.as_deref().unwrap_or("-"),
            describe_price(&rule.price)
        );
    }

    println!("  {}", "-".repeat(78));
    println!(
        "  Unknown models: ${:.4}/image  |  Batch multiplier: {:.2} (flat and per-MP only)",
        table.fallback_cost(),
        table.batch_discount()
    );
    println!();

    Ok(())
}

/// One-line human description of a billing shape
pub(crate) fn describe_price(price: &PricingModel) -> String {
    match price {
        PricingModel::Flat { amount } => format!("${amount:.4}/image"),
        PricingModel::FlatByResolution { standard, uhd } => {
            format!("${standard:.4}/image, ${uhd:.4} at 4K")
        }
        PricingModel::PerMegapixel { rate } => format!("${rate:.4}/MP"),
        PricingModel::TieredPerMegapixel {
            first_mp,
            additional_mp_rate,
        } => format!("${first_mp:.4} first MP + ${additional_mp_rate:.4}/extra MP"),
    }
}
