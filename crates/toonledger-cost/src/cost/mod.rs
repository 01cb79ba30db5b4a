//! Cost Tracking - image generation spend ledger
//!
//! This module prices image generation calls, keeps a per-run ledger,
//! rewrites a live snapshot for monitors after every call, and produces
//! summaries and exports on demand.
//!
//! # Module Structure
//!
//! - `pricing`: Billing models, pricing table and defaults
//! - `record`: Call descriptors and ledger records
//! - `ledger`: Append-only record store with running total
//! - `aggregate`: Grouped statistics over the ledger
//! - `snapshot`: Live snapshot file
//! - `report`: Rounding, export document, text report
//! - `config`: Tracker configuration
//! - `tracker`: CostTracker implementation
//! - `global`: Global tracker accessor

mod aggregate;
mod config;
mod global;
mod ledger;
mod pricing;
mod record;
mod report;
mod snapshot;
mod tracker;


// Re-export public types
pub use aggregate::{
    group_by_model, group_by_phase, percent_used, summarize, BudgetStatus, GroupStats,
    StatusCounts, Summary, UNSPECIFIED_PHASE,
};
pub use config::{TrackerConfig, DEFAULT_BUDGET_USD, DEFAULT_WARN_PERCENT};
pub use global::{global_tracker, install_global_tracker, reset_global_tracker};
pub use ledger::Ledger;
pub use pricing::{
    billable_megapixels, default_pricing, PricingConfig, PricingModel, PricingRule, PricingTable,
    PricingTableBuilder, DEFAULT_BATCH_DISCOUNT, DEFAULT_FALLBACK_COST,
};
pub use record::{
    CallDescriptor, CallRecord, CallStatus, ImageDimensions, Metadata, TokenUsage, UNKNOWN_PLATFORM,
};
pub use report::{format_summary, round_currency, round_to, ExportDocument};
pub use snapshot::{
    read_live, LastCall, LiveSnapshot, ModelRollup, SnapshotWriter, DEFAULT_SNAPSHOT_PATH,
};
pub use tracker::{CostTracker, SessionInfo};
