//! Aggregation - derived statistics over the ledger
//!
//! Everything here is a pure function of the ledger's current contents.
//! Figures are kept unrounded; rounding happens in [`Summary::rounded`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ledger::Ledger;
use super::record::{CallRecord, CallStatus, TokenUsage};
use super::report::{round_currency, round_to};
use super::tracker::SessionInfo;

/// Bucket for calls recorded without a phase
pub const UNSPECIFIED_PHASE: &str = "unspecified";

/// Count and spend for one group
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    /// Calls in the group
    pub count: u64,
    /// Spend in the group (USD)
    pub cost_usd: f64,
}

impl GroupStats {
    fn add(&mut self, record: &CallRecord) {
        self.count += 1;
        self.cost_usd += record.cost_usd;
    }

    fn rounded(self) -> Self {
        Self {
            count: self.count,
            cost_usd: round_currency(self.cost_usd),
        }
    }
}

/// Call counts for every status. All three keys are always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Successful calls
    pub success: u64,
    /// Failed calls
    pub failed: u64,
    /// Retried calls
    pub retried: u64,
}

impl StatusCounts {
    /// Count for one status
    pub fn get(&self, status: CallStatus) -> u64 {
        match status {
            CallStatus::Success => self.success,
            CallStatus::Failed => self.failed,
            CallStatus::Retried => self.retried,
        }
    }

    fn increment(&mut self, status: CallStatus) {
        match status {
            CallStatus::Success => self.success += 1,
            CallStatus::Failed => self.failed += 1,
            CallStatus::Retried => self.retried += 1,
        }
    }
}

/// Spend relative to the session budget. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// No budget configured (budget of zero)
    Unbudgeted,
    /// Below the warning threshold
    WithinBudget,
    /// At or above the warning threshold
    Warning,
    /// At or above the budget
    Exceeded,
}

impl BudgetStatus {
    /// Classify spend against a budget and warning threshold (percent)
    pub fn classify(total_cost: f64, budget: f64, warn_percent: f64) -> Self {
        if budget <= 0.0 {
            return Self::Unbudgeted;
        }
        let percent = percent_used(total_cost, budget);
        if percent >= 100.0 {
            Self::Exceeded
        } else if percent >= warn_percent {
            Self::Warning
        } else {
            Self::WithinBudget
        }
    }

    /// Whether the budget has been reached
    pub fn is_exceeded(&self) -> bool {
        matches!(self, Self::Exceeded)
    }
}

/// Full session summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Session identifier
    pub session_id: String,
    /// Session start
    pub start_time: DateTime<Utc>,
    /// When this summary was generated
    pub end_time: DateTime<Utc>,
    /// Recorded calls of any status
    pub total_calls: u64,
    /// Total spend (USD)
    pub total_cost_usd: f64,
    /// Session budget (USD)
    pub budget_usd: f64,
    /// Budget left, never negative
    pub remaining_usd: f64,
    /// Spend as a percentage of the budget; 0 without a budget
    pub percent_used: f64,
    /// Spend classification
    pub budget_status: BudgetStatus,
    /// Per-model rollup
    pub by_model: BTreeMap<String, GroupStats>,
    /// Per-phase rollup
    pub by_phase: BTreeMap<String, GroupStats>,
    /// Per-status counts
    pub by_status: StatusCounts,
    /// Token totals
    pub total_tokens: TokenUsage,
    /// Sum of generation durations
    pub total_generation_time_ms: u64,
    /// Mean generation duration; 0 when empty
    pub average_generation_time_ms: f64,
}

impl Summary {
    /// Presentation copy: currency to 4 places, percent and average to 2
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self {
            total_cost_usd: round_currency(self.total_cost_usd),
            budget_usd: round_currency(self.budget_usd),
            remaining_usd: round_currency(self.remaining_usd),
            percent_used: round_to(self.percent_used, 2),
            by_model: round_groups(&self.by_model),
            by_phase: round_groups(&self.by_phase),
            average_generation_time_ms: round_to(self.average_generation_time_ms, 2),
            ..self.clone()
        }
    }
}

fn round_groups(groups: &BTreeMap<String, GroupStats>) -> BTreeMap<String, GroupStats> {
    groups
        .iter()
        .map(|(k, v)| (k.clone(), v.rounded()))
        .collect()
}

/// `total / budget * 100`, or 0 when there is no budget
pub fn percent_used(total_cost: f64, budget: f64) -> f64 {
    if budget > 0.0 {
        total_cost / budget * 100.0
    } else {
        0.0
    }
}

/// Count and spend per model
pub fn group_by_model(records: &[CallRecord]) -> BTreeMap<String, GroupStats> {
    group_by(records, |r| r.model.as_str())
}

/// Count and spend per phase, with missing phases under [`UNSPECIFIED_PHASE`]
pub fn group_by_phase(records: &[CallRecord]) -> BTreeMap<String, GroupStats> {
    group_by(records, CallRecord::phase_bucket)
}

fn group_by<'a, F>(records: &'a [CallRecord], key: F) -> BTreeMap<String, GroupStats>
where
    F: Fn(&'a CallRecord) -> &'a str,
{
    let mut groups: BTreeMap<String, GroupStats> = BTreeMap::new();
    for record in records {
        groups
            .entry(key(record).to_string())
            .or_default()
            .add(record);
    }
    groups
}

/// Summarize the ledger for a session
pub fn summarize(session: &SessionInfo, ledger: &Ledger) -> Summary {
    let records = ledger.records();

    let mut total_cost = 0.0;
    let mut by_status = StatusCounts::default();
    let mut total_tokens = TokenUsage::default();
    let mut total_generation_time_ms: u64 = 0;

    for record in records {
        total_cost += record.cost_usd;
        by_status.increment(record.status);
        total_tokens.accumulate(&record.tokens);
        total_generation_time_ms =
            total_generation_time_ms.saturating_add(record.generation_duration_ms);
    }

    let total_calls = records.len() as u64;
    let average_generation_time_ms = if total_calls > 0 {
        total_generation_time_ms as f64 / total_calls as f64
    } else {
        0.0
    };

    Summary {
        session_id: session.session_id.clone(),
        start_time: session.start_time,
        end_time: Utc::now(),
        total_calls,
        total_cost_usd: total_cost,
        budget_usd: session.budget_usd,
        remaining_usd: (session.budget_usd - total_cost).max(0.0),
        percent_used: percent_used(total_cost, session.budget_usd),
        budget_status: BudgetStatus::classify(total_cost, session.budget_usd, session.warn_percent),
        by_model: group_by_model(records),
        by_phase: group_by_phase(records),
        by_status,
        total_tokens,
        total_generation_time_ms,
        average_generation_time_ms,
    }
}
