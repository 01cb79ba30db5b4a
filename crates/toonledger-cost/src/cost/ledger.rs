//! Ledger - append-only store of recorded calls

use super::record::CallRecord;

/// Ordered, append-only sequence of call records with a running total.
///
/// `total_cost` is accumulated in insertion order, so it is always exactly
/// equal to re-summing `records()` front to back.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    records: Vec<CallRecord>,
    total_cost: f64,
}

impl Ledger {
    /// Empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next appended record will carry
    pub fn next_sequence(&self) -> u64 {
        self.records.len() as u64 + 1
    }

    /// Append a record and add its cost to the running total
    pub fn append(&mut self, record: CallRecord) -> &CallRecord {
        self.total_cost += record.cost_usd;
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    /// Records in insertion order
    pub fn records(&self) -> &[CallRecord] {
        &self.records
    }

    /// Most recently appended record
    pub fn last(&self) -> Option<&CallRecord> {
        self.records.last()
    }

    /// Incrementally maintained total cost
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    /// Total recomputed from the records
    pub fn resum(&self) -> f64 {
        self.records.iter().fold(0.0, |acc, r| acc + r.cost_usd)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
