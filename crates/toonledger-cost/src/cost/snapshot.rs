//! Live Snapshot - compact state file for out-of-process monitors
//!
//! The tracker rewrites this file after every recorded call. Readers never
//! see a partial file: content goes to a uniquely named temp file next to
//! the target first and is renamed over it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::aggregate::{group_by_model, group_by_phase, percent_used, GroupStats};
use super::ledger::Ledger;
use super::pricing::PricingTable;
use super::record::{CallRecord, CallStatus};
use super::report::{round_currency, round_to};
use super::tracker::SessionInfo;
use crate::error::{Error, Result};

/// Default location of the live snapshot, relative to the working directory
pub const DEFAULT_SNAPSHOT_PATH: &str = "reports/live_cost.json";

/// Digest of the most recent call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastCall {
    /// Model identifier
    pub model: String,
    /// Charged cost (USD), rounded
    pub cost_usd: f64,
    /// Panel or asset id
    pub work_item_id: String,
    /// Outcome
    pub status: CallStatus,
}

/// Per-model rollup with a display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRollup {
    /// Display name from the pricing table
    pub short_name: String,
    /// Calls of any status
    pub count: u64,
    /// Spend (USD), rounded
    pub cost_usd: f64,
}

/// Compact current-state view written after every call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSnapshot {
    /// Session identifier
    pub session_id: String,
    /// Total spend (USD), rounded
    pub total_cost_usd: f64,
    /// Session budget (USD)
    pub budget_usd: f64,
    /// Spend as a percentage of the budget
    pub percent_used: f64,
    /// Recorded calls of any status
    pub total_calls: u64,
    /// Most recent call; `None` before the first one
    pub last_call: Option<LastCall>,
    /// Per-phase rollup
    pub by_phase: BTreeMap<String, GroupStats>,
    /// Per-model rollup keyed by model id
    pub by_model: BTreeMap<String, ModelRollup>,
    /// When the snapshot was built
    pub updated_at: DateTime<Utc>,
}

impl LiveSnapshot {
    /// Build the view from the ledger. Figures are rounded for presentation.
    pub fn from_ledger(session: &SessionInfo, ledger: &Ledger, pricing: &PricingTable) -> Self {
        let total_cost = ledger.total_cost();

        let by_phase = group_by_phase(ledger.records())
            .into_iter()
            .map(|(phase, stats)| {
                (
                    phase,
                    GroupStats {
                        count: stats.count,
                        cost_usd: round_currency(stats.cost_usd),
                    },
                )
            })
            .collect();

        let by_model = group_by_model(ledger.records())
            .into_iter()
            .map(|(model, stats)| {
                let rollup = ModelRollup {
                    short_name: pricing.short_name(&model).to_string(),
                    count: stats.count,
                    cost_usd: round_currency(stats.cost_usd),
                };
                (model, rollup)
            })
            .collect();

        Self {
            session_id: session.session_id.clone(),
            total_cost_usd: round_currency(total_cost),
            budget_usd: round_currency(session.budget_usd),
            percent_used: round_to(percent_used(total_cost, session.budget_usd), 2),
            total_calls: ledger.len() as u64,
            last_call: ledger.last().map(LastCall::from),
            by_phase,
            by_model,
            updated_at: Utc::now(),
        }
    }
}

impl From<&CallRecord> for LastCall {
    fn from(record: &CallRecord) -> Self {
        Self {
            model: record.model.clone(),
            cost_usd: round_currency(record.cost_usd),
            work_item_id: record.work_item_id.clone(),
            status: record.status,
        }
    }
}

/// Serializes live snapshots to a fixed path.
///
/// Writes are serialized and ordered by ledger sequence: a snapshot older
/// than the last one written is dropped.
#[derive(Debug)]
pub struct SnapshotWriter {
    path: Option<PathBuf>,
    last_written: Mutex<u64>,
    failures: AtomicU64,
    last_error: std::sync::Mutex<Option<String>>,
}

impl SnapshotWriter {
    /// Writer targeting `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_path(Some(path.into()))
    }

    /// Writer that never touches the filesystem
    pub fn disabled() -> Self {
        Self::with_path(None)
    }

    fn with_path(path: Option<PathBuf>) -> Self {
        Self {
            path,
            last_written: Mutex::new(0),
            failures: AtomicU64::new(0),
            last_error: std::sync::Mutex::new(None),
        }
    }

    /// Target path, if enabled
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of failed writes so far
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Message of the most recent failed write
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .map(|e| e.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Write the snapshot for ledger position `sequence`.
    ///
    /// Failures are logged and counted, never returned.
    pub async fn write_live(&self, sequence: u64, snapshot: &LiveSnapshot) {
        let Some(path) = self.path.as_deref() else {
            return;
        };

        let mut last_written = self.last_written.lock().await;
        if sequence <= *last_written {
            debug!(
                sequence,
                last = *last_written,
                "skipping stale live snapshot"
            );
            return;
        }

        match write_json_atomic(path, snapshot).await {
            Ok(()) => *last_written = sequence,
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(path = %path.display(), error = %e, "failed to write live cost snapshot");
                let mut last_error = self
                    .last_error
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                *last_error = Some(e.to_string());
            }
        }
    }
}

/// Read a live snapshot file
pub async fn read_live(path: impl AsRef<Path>) -> Result<LiveSnapshot> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::io(path, e))?;
    Ok(serde_json::from_str(&content)?)
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
///
/// Every write goes through its own temp file in the target directory, so
/// concurrent writers sharing one path never touch each other's partial
/// output.
pub(crate) async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    let target = path.to_path_buf();

    tokio::task::spawn_blocking(move || persist_atomic(&target, &json))
        .await
        .map_err(|e| Error::io(path, std::io::Error::other(e)))?
}

fn persist_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let mut prefix = std::ffi::OsString::from(".");
    prefix.push(path.file_name().unwrap_or_default());
    prefix.push(".");

    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| Error::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| Error::io(tmp.path(), e))?;

    // Dropping the temp file on error removes it
    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}
