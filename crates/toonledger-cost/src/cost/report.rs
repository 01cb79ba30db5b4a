//! Cost Reporting
//!
//! Presentation helpers: fixed-precision rounding, the export document and
//! the text summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::aggregate::{BudgetStatus, Summary};
use super::record::{CallRecord, CallStatus};

/// Decimal places used for currency at presentation boundaries
pub const CURRENCY_DECIMALS: i32 = 4;

/// Round to a number of decimal places
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Round a USD amount for presentation
#[must_use]
pub fn round_currency(value: f64) -> f64 {
    round_to(value, CURRENCY_DECIMALS)
}

/// Document written by `CostTracker::export`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    /// Rounded session summary
    pub summary: Summary,
    /// Every recorded call, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calls: Option<Vec<CallRecord>>,
    /// When the export was produced
    pub exported_at: DateTime<Utc>,
}

/// Format a summary as text
#[must_use]
pub fn format_summary(summary: &Summary) -> String {
    let summary = summary.rounded();
    let mut output = String::new();

    output.push_str("📊 **Image Generation Cost Report**\n\n");
    output.push_str(&format!("Session: {}\n", summary.session_id));
    output.push_str(&format!(
        "Started: {}\n",
        summary.start_time.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output.push_str("\n**Summary:**\n");
    output.push_str(&format!("• Total Calls: {}\n", summary.total_calls));
    output.push_str(&format!("• Total Cost: ${:.4}\n", summary.total_cost_usd));
    match summary.budget_status {
        BudgetStatus::Unbudgeted => output.push_str("• Budget: none\n"),
        status => output.push_str(&format!(
            "• Budget: ${:.2} ({:.1}% used, ${:.4} remaining){}\n",
            summary.budget_usd,
            summary.percent_used,
            summary.remaining_usd,
            budget_marker(status)
        )),
    }
    output.push_str(&format!(
        "• Avg Generation Time: {:.0}ms\n",
        summary.average_generation_time_ms
    ));
    let tokens = summary.total_tokens;
    if tokens.prompt + tokens.output + tokens.cached > 0 {
        output.push_str(&format!(
            "• Tokens: {} prompt, {} output, {} cached\n",
            tokens.prompt, tokens.output, tokens.cached
        ));
    }

    output.push_str("\n**By Model:**\n");
    for (model, stats) in &summary.by_model {
        output.push_str(&format!(
            "• {}: {} calls, ${:.4}\n",
            model, stats.count, stats.cost_usd
        ));
    }

    output.push_str("\n**By Phase:**\n");
    for (phase, stats) in &summary.by_phase {
        output.push_str(&format!(
            "• {}: {} calls, ${:.4}\n",
            phase, stats.count, stats.cost_usd
        ));
    }

    output.push_str("\n**By Status:**\n");
    for status in CallStatus::ALL {
        let count = summary.by_status.get(status);
        if count > 0 {
            output.push_str(&format!("• {}: {}\n", status, count));
        }
    }

    output
}

fn budget_marker(status: BudgetStatus) -> &'static str {
    match status {
        BudgetStatus::Warning => " ⚠️",
        BudgetStatus::Exceeded => " ❗ over budget",
        _ => "",
    }
}
