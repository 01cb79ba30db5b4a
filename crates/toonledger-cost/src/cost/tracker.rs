//! Cost Tracker - per-run ledger of image generation spend
//!
//! One tracker is created per pipeline run and shared by reference
//! (`Arc<CostTracker>`) with every worker that issues generation calls.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::aggregate::{summarize, BudgetStatus, Summary};
use super::config::{TrackerConfig, DEFAULT_BUDGET_USD, DEFAULT_WARN_PERCENT};
use super::ledger::Ledger;
use super::pricing::PricingTable;
use super::record::{CallDescriptor, CallRecord, ImageDimensions, UNKNOWN_PLATFORM};
use super::report::{format_summary, ExportDocument};
use super::snapshot::{write_json_atomic, LiveSnapshot, SnapshotWriter};
use crate::error::Result;

const ALERT_NONE: u8 = 0;
const ALERT_WARNING: u8 = 1;
const ALERT_EXCEEDED: u8 = 2;

/// Identity and budget of one tracking session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    /// Session identifier
    pub session_id: String,
    /// Advisory budget (USD), never negative
    pub budget_usd: f64,
    /// Warning threshold (percent of budget)
    pub warn_percent: f64,
    /// When the session started
    pub start_time: DateTime<Utc>,
}

impl SessionInfo {
    /// Start a session now. Without an id, one is derived from the start time.
    pub fn new(session_id: Option<String>, budget_usd: f64) -> Self {
        let start_time = Utc::now();
        let session_id = session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("session-{}", start_time.format("%Y%m%d-%H%M%S")));
        let budget_usd = if budget_usd.is_finite() && budget_usd > 0.0 {
            budget_usd
        } else {
            0.0
        };

        Self {
            session_id,
            budget_usd,
            warn_percent: DEFAULT_WARN_PERCENT,
            start_time,
        }
    }

    /// Set the warning threshold
    #[must_use]
    pub fn with_warn_percent(mut self, warn_percent: f64) -> Self {
        self.warn_percent = warn_percent;
        self
    }
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self::new(None, DEFAULT_BUDGET_USD)
    }
}

/// Cost tracker for image generation calls
#[derive(Debug)]
pub struct CostTracker {
    /// Session identity and budget
    session: SessionInfo,
    /// Pricing information
    pricing: PricingTable,
    /// Recorded calls and running total
    ledger: RwLock<Ledger>,
    /// Live snapshot output
    snapshots: SnapshotWriter,
    /// Highest budget alert already logged
    alert_level: AtomicU8,
}

impl Default for CostTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl CostTracker {
    /// Create a tracker from configuration
    #[must_use]
    pub fn new(config: TrackerConfig) -> Self {
        let session = SessionInfo::new(config.session_id, config.budget_usd)
            .with_warn_percent(config.warn_percent);
        let snapshots = if config.snapshot_enabled {
            SnapshotWriter::new(config.snapshot_path)
        } else {
            SnapshotWriter::disabled()
        };

        Self::from_parts(
            session,
            PricingTable::from_config(&config.pricing),
            snapshots,
        )
    }

    /// Create a tracker from prepared parts
    #[must_use]
    pub fn from_parts(
        session: SessionInfo,
        pricing: PricingTable,
        snapshots: SnapshotWriter,
    ) -> Self {
        debug!(
            session_id = %session.session_id,
            budget_usd = session.budget_usd,
            snapshot = ?snapshots.path(),
            "cost tracker created"
        );
        Self {
            session,
            pricing,
            ledger: RwLock::new(Ledger::new()),
            snapshots,
            alert_level: AtomicU8::new(ALERT_NONE),
        }
    }

    /// Tracker that keeps everything in memory
    #[must_use]
    pub fn in_memory(session: SessionInfo, pricing: PricingTable) -> Self {
        Self::from_parts(session, pricing, SnapshotWriter::disabled())
    }

    /// Session identity and budget
    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    /// Session identifier
    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    /// Pricing table in use
    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    /// Live snapshot location, if enabled
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshots.path()
    }

    /// Number of live snapshot writes that failed
    pub fn snapshot_failures(&self) -> u64 {
        self.snapshots.failures()
    }

    /// Message of the most recent failed snapshot write
    pub fn last_snapshot_error(&self) -> Option<String> {
        self.snapshots.last_error()
    }

    /// Price a call without recording it
    pub fn quote(&self, model: &str, dimensions: ImageDimensions, is_batch: bool) -> f64 {
        self.pricing.resolve(model, dimensions, is_batch)
    }

    /// Record a completed generation attempt.
    ///
    /// Only successful calls are priced; every other status costs zero. The
    /// ledger is updated before the live snapshot is written, and a failed
    /// write never affects the returned record.
    pub async fn record(&self, call: CallDescriptor) -> CallRecord {
        let billable = call.status.is_success();
        let cost_usd = if billable {
            self.pricing
                .resolve(&call.model, call.dimensions, call.is_batch)
        } else {
            0.0
        };
        let platform = call
            .platform
            .or_else(|| self.pricing.platform(&call.model).map(str::to_string))
            .unwrap_or_else(|| UNKNOWN_PLATFORM.to_string());
        let error_message = if billable { None } else { call.error_message };

        let (record, snapshot, total_cost) = {
            let mut ledger = self.ledger.write().await;
            let record = CallRecord {
                sequence: ledger.next_sequence(),
                timestamp: Utc::now(),
                platform,
                model: call.model,
                work_item_id: call.work_item_id,
                phase: call.phase,
                scene_id: call.scene_id,
                cost_usd,
                generation_duration_ms: call.generation_duration_ms,
                dimensions: call.dimensions,
                megapixels: call.dimensions.megapixels(),
                resolution: call.dimensions.resolution_class().to_string(),
                is_batch: call.is_batch,
                status: call.status,
                error_message,
                tokens: call.tokens,
                metadata: call.metadata,
            };
            ledger.append(record.clone());

            let snapshot = self
                .snapshots
                .path()
                .map(|_| LiveSnapshot::from_ledger(&self.session, &ledger, &self.pricing));
            (record, snapshot, ledger.total_cost())
        };

        debug!(
            sequence = record.sequence,
            model = %record.model,
            work_item = %record.work_item_id,
            status = %record.status,
            cost_usd = record.cost_usd,
            total_cost_usd = total_cost,
            "recorded generation call"
        );

        self.raise_budget_alert(total_cost);

        if let Some(snapshot) = snapshot {
            self.snapshots.write_live(record.sequence, &snapshot).await;
        }

        record
    }

    fn raise_budget_alert(&self, total_cost: f64) {
        let status = BudgetStatus::classify(
            total_cost,
            self.session.budget_usd,
            self.session.warn_percent,
        );
        let level = match status {
            BudgetStatus::Exceeded => ALERT_EXCEEDED,
            BudgetStatus::Warning => ALERT_WARNING,
            BudgetStatus::WithinBudget | BudgetStatus::Unbudgeted => return,
        };

        if self.alert_level.fetch_max(level, Ordering::SeqCst) < level {
            warn!(
                session_id = %self.session.session_id,
                total_cost_usd = total_cost,
                budget_usd = self.session.budget_usd,
                status = ?status,
                "image generation spend crossed budget threshold"
            );
        }
    }

    /// Unrounded summary straight from the aggregator
    pub async fn raw_summary(&self) -> Summary {
        let ledger = self.ledger.read().await;
        summarize(&self.session, &ledger)
    }

    /// Summary rounded for presentation
    pub async fn summary(&self) -> Summary {
        self.raw_summary().await.rounded()
    }

    /// Non-blocking summary for render loops.
    /// Returns `None` if a recording holds the ledger lock.
    pub fn try_summary(&self) -> Option<Summary> {
        let ledger = self.ledger.try_read().ok()?;
        Some(summarize(&self.session, &ledger).rounded())
    }

    /// Running total (USD), unrounded
    pub async fn total_cost(&self) -> f64 {
        self.ledger.read().await.total_cost()
    }

    /// Number of recorded calls
    pub async fn total_calls(&self) -> usize {
        self.ledger.read().await.len()
    }

    /// Spend classification against the budget
    pub async fn budget_status(&self) -> BudgetStatus {
        let total = self.total_cost().await;
        BudgetStatus::classify(total, self.session.budget_usd, self.session.warn_percent)
    }

    /// Copy of every record, in recording order
    pub async fn records(&self) -> Vec<CallRecord> {
        self.ledger.read().await.records().to_vec()
    }

    /// Copy of the ledger
    pub async fn ledger_snapshot(&self) -> Ledger {
        self.ledger.read().await.clone()
    }

    /// Most recent records, oldest first
    pub async fn recent_records(&self, limit: usize) -> Vec<CallRecord> {
        let ledger = self.ledger.read().await;
        let records = ledger.records();
        let start = records.len().saturating_sub(limit);
        records[start..].to_vec()
    }

    /// Records for one panel or asset
    pub async fn work_item_records(&self, work_item_id: &str) -> Vec<CallRecord> {
        let ledger = self.ledger.read().await;
        ledger
            .records()
            .iter()
            .filter(|r| r.work_item_id == work_item_id)
            .cloned()
            .collect()
    }

    /// Build the export document
    pub async fn export_document(&self, include_records: bool) -> ExportDocument {
        let ledger = self.ledger.read().await;
        ExportDocument {
            summary: summarize(&self.session, &ledger).rounded(),
            calls: include_records.then(|| ledger.records().to_vec()),
            exported_at: Utc::now(),
        }
    }

    /// Write the summary, and optionally every record, as JSON to `path`
    pub async fn export(&self, path: impl AsRef<Path>, include_records: bool) -> Result<()> {
        let path = path.as_ref();
        let document = self.export_document(include_records).await;

        match write_json_atomic(path, &document).await {
            Ok(()) => {
                info!(
                    path = %path.display(),
                    calls = document.summary.total_calls,
                    "exported cost tracking data"
                );
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to export cost tracking data");
                Err(e)
            }
        }
    }

    /// Format the summary as text
    pub async fn format_summary(&self) -> String {
        format_summary(&self.raw_summary().await)
    }
}
