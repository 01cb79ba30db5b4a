//! Toonledger Cost - image generation cost engine
//!
//! This crate tracks spend for the novel-to-webtoon pipeline:
//! - Pricing: flat, per-megapixel and tiered per-megapixel billing
//! - Ledger: append-only record of every generation attempt
//! - Aggregation: spend by model, phase and status against a budget
//! - Live snapshot: JSON state file rewritten after every call
//! - Export and text reports

#![forbid(unsafe_code)]

pub mod cost;
pub mod error;

pub use cost::{
    billable_megapixels, default_pricing, format_summary, global_tracker, install_global_tracker,
    read_live, reset_global_tracker, round_currency, summarize, BudgetStatus, CallDescriptor,
    CallRecord, CallStatus, CostTracker, ExportDocument, GroupStats, ImageDimensions, Ledger,
    LiveSnapshot, PricingConfig, PricingModel, PricingRule, PricingTable, SessionInfo,
    StatusCounts, Summary, TokenUsage, TrackerConfig, UNKNOWN_PLATFORM,
};
pub use error::{Error, Result};
