//! CLI command: `toonledger simulate`
//!
//! Replays a short episode (character sheets, artifacts, scene panels and
//! one rejected panel) through a real tracker, then prints the cost report.

use std::path::PathBuf;

use toonledger_cost::{CallDescriptor, CostTracker, TokenUsage};
use tracing::info;

use crate::config::AppConfig;

const PRO_MODEL: &str = "gemini-3-pro-image-preview";
const FLASH_MODEL: &str = "gemini-2.5-flash-image";
const SCENE: &str = "scene_01_request";

/// Options for the simulate subcommand
#[derive(Debug, Clone, Default)]
pub struct SimulateOptions {
    pub session_id: Option<String>,
    pub budget: Option<f64>,
    pub export: Option<PathBuf>,
    pub include_records: bool,
    pub snapshot: bool,
}

/// Run the simulate subcommand.
pub async fn run(config: AppConfig, options: SimulateOptions) -> anyhow::Result<()> {
    let tracker = build_tracker(config, &options);
    info!(session_id = %tracker.session_id(), "Replaying sample session");

    for call in sample_session() {
        tracker.record(call).await;
    }

    println!("{}", tracker.format_summary().await);

    if let Some(path) = &options.export {
        tracker.export(path, options.include_records).await?;
        println!("Exported cost data to {}", path.display());
    }

    Ok(())
}

fn build_tracker(config: AppConfig, options: &SimulateOptions) -> CostTracker {
    let mut tracker = config.tracker;
    if let Some(session_id) = &options.session_id {
        tracker = tracker.with_session_id(session_id.clone());
    }
    if let Some(budget) = options.budget {
        tracker = tracker.with_budget(budget);
    }
    if !options.snapshot {
        tracker = tracker.without_snapshot();
    }
    CostTracker::new(tracker)
}

/// Calls of the sample session, in pipeline order
pub fn sample_session() -> Vec<CallDescriptor> {
    let mut calls = vec![
        character("jin_sohan_base", 3200, TokenUsage::new(150, 1290, 0)),
        character("dokma_base", 3100, TokenUsage::new(145, 1285, 0)),
        CallDescriptor::success(PRO_MODEL, "twin_blades_base")
            .with_phase("artifact_generation")
            .with_dimensions(2048, 2048)
            .with_duration_ms(2800)
            .with_tokens(TokenUsage::new(120, 1100, 0)),
    ];

    calls.extend((0..5u64).map(|i| {
        let cached = if i > 0 { 50 } else { 0 };
        CallDescriptor::success(FLASH_MODEL, format!("s1_p0{}", i + 1))
            .with_scene(SCENE)
            .with_phase("panel_generation")
            .with_dimensions(1024, 1024)
            .with_duration_ms(2000 + i * 100)
            .with_tokens(TokenUsage::new(80, 900, cached))
    }));

    calls.push(
        CallDescriptor::failed(FLASH_MODEL, "s1_p06_failed", "Content filter triggered")
            .with_scene(SCENE)
            .with_phase("panel_generation")
            .with_dimensions(1024, 1024)
            .with_duration_ms(1500)
            .with_tokens(TokenUsage::new(80, 0, 0)),
    );

    calls
}

fn character(work_item_id: &str, duration_ms: u64, tokens: TokenUsage) -> CallDescriptor {
    CallDescriptor::success(PRO_MODEL, work_item_id)
        .with_phase("character_generation")
        .with_dimensions(2048, 2048)
        .with_duration_ms(duration_ms)
        .with_tokens(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use toonledger_cost::{round_currency, CallStatus, ExportDocument};

    fn options(dir: &TempDir) -> SimulateOptions {
        SimulateOptions {
            session_id: Some("poc-v2-test-001".to_string()),
            budget: None,
            export: Some(dir.path().join("cost_tracking_test.json")),
            include_records: true,
            snapshot: false,
        }
    }

    #[tokio::test]
    async fn test_sample_session_costs() {
        let tracker = build_tracker(AppConfig::default(), &SimulateOptions::default());
        for call in sample_session() {
            tracker.record(call).await;
        }

        let summary = tracker.summary().await;
        assert_eq!(summary.total_calls, 9);
        assert_eq!(summary.by_status.get(CallStatus::Success), 8);
        assert_eq!(summary.by_status.get(CallStatus::Failed), 1);
        // 3 x 0.134 + 5 x 0.039
        assert_eq!(summary.total_cost_usd, round_currency(0.597));
        assert_eq!(summary.by_phase["character_generation"].count, 2);
        assert_eq!(summary.by_phase["panel_generation"].count, 6);
        assert_eq!(summary.total_tokens.cached, 200);
        assert!(tracker.snapshot_path().is_none());
    }

    #[tokio::test]
    async fn test_run_exports_document() {
        let dir = TempDir::new().unwrap();
        let options = options(&dir);
        let export = options.export.clone().unwrap();

        run(AppConfig::default(), options).await.unwrap();

        let doc: ExportDocument =
            serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
        assert_eq!(doc.summary.session_id, "poc-v2-test-001");
        assert_eq!(doc.calls.map(|c| c.len()), Some(9));
    }

    #[tokio::test]
    async fn test_run_without_records() {
        let dir = TempDir::new().unwrap();
        let mut options = options(&dir);
        options.include_records = false;
        let export = options.export.clone().unwrap();

        run(AppConfig::default(), options).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
        assert!(raw.get("summary").is_some());
        assert!(raw.get("calls").is_none());
    }
}
