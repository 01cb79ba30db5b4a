//! Global Cost Tracker
//!
//! Process-wide tracker for call sites that cannot be handed an
//! `Arc<CostTracker>` directly. Prefer explicit passing.

use super::config::TrackerConfig;
use super::tracker::CostTracker;
use std::sync::{Arc, RwLock};

static GLOBAL_TRACKER: RwLock<Option<Arc<CostTracker>>> = RwLock::new(None);

/// Get the global cost tracker, creating it with default configuration on
/// first use. Concurrent first calls all receive the same instance.
#[must_use]
pub fn global_tracker() -> Arc<CostTracker> {
    if let Some(tracker) = GLOBAL_TRACKER
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .as_ref()
    {
        return Arc::clone(tracker);
    }

    let mut slot = GLOBAL_TRACKER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(slot.get_or_insert_with(|| Arc::new(CostTracker::default())))
}

/// Replace the global tracker with a fresh one and return it
pub fn reset_global_tracker(session_id: Option<String>) -> Arc<CostTracker> {
    let config = match session_id {
        Some(id) => TrackerConfig::default().with_session_id(id),
        None => TrackerConfig::default(),
    };
    install_global_tracker(Arc::new(CostTracker::new(config)))
}

/// Install an explicitly configured tracker as the global one
pub fn install_global_tracker(tracker: Arc<CostTracker>) -> Arc<CostTracker> {
    let mut slot = GLOBAL_TRACKER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = Some(Arc::clone(&tracker));
    tracker
}
