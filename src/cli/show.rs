//! CLI command: `toonledger show`
//!
//! Reads the live snapshot a running pipeline rewrites after every call.

use std::path::Path;

use toonledger_cost::{read_live, LiveSnapshot};

/// Run the show subcommand.
pub async fn run(path: &Path, json: bool, watch: bool, interval: u64) -> anyhow::Result<()> {
    if watch {
        run_watch(path, json, interval.max(1)).await
    } else {
        let snapshot = read_live(path).await?;
        print_snapshot(&snapshot, json)
    }
}

/// Watch mode: refresh the display until interrupted.
async fn run_watch(path: &Path, json: bool, interval: u64) -> anyhow::Result<()> {
    loop {
        // Clear screen
        print!("\x1b[2J\x1b[H");
        match read_live(path).await {
            Ok(snapshot) => print_snapshot(&snapshot, json)?,
            Err(e) => println!("  Waiting for {} ({e})", path.display()),
        }
        println!("  (refreshing every {interval}s, Ctrl+C to exit)");
        tokio::time::sleep(tokio::time::Duration::from_secs(interval)).await;
    }
}

fn print_snapshot(snapshot: &LiveSnapshot, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
    } else {
        print!("{}", render_table(snapshot));
    }
    Ok(())
}

fn render_table(snapshot: &LiveSnapshot) -> String {
    let mut out = String::new();
    let rule = format!("  {}\n", "-".repeat(60));

    out.push('\n');
    out.push_str(&format!("  Live Cost - {}\n", snapshot.session_id));
    out.push_str(&rule);
    out.push_str(&format!(
        "  Total: ${:.4} / ${:.2} ({:.1}%)  |  Calls: {}\n",
        snapshot.total_cost_usd, snapshot.budget_usd, snapshot.percent_used, snapshot.total_calls
    ));

    if let Some(last) = &snapshot.last_call {
        out.push_str(&format!(
            "  Last:  {} {} ${:.4} [{}]\n",
            last.work_item_id, last.model, last.cost_usd, last.status
        ));
    }

    if !snapshot.by_model.is_empty() {
        out.push_str(&rule);
        out.push_str(&format!("  {:<28} {:>6} {:>12}\n", "Model", "Calls", "Cost"));
        for rollup in snapshot.by_model.values() {
            out.push_str(&format!(
                "  {:<28} {:>6} {:>12}\n",
                rollup.short_name,
                rollup.count,
                format!("${:.4}", rollup.cost_usd)
            ));
        }
    }

    if !snapshot.by_phase.is_empty() {
        out.push_str(&rule);
        out.push_str(&format!("  {:<28} {:>6} {:>12}\n", "Phase", "Calls", "Cost"));
        for (phase, stats) in &snapshot.by_phase {
            out.push_str(&format!(
                "  {:<28} {:>6} {:>12}\n",
                phase,
                stats.count,
                format!("${:.4}", stats.cost_usd)
            ));
        }
    }

    out.push_str(&rule);
    out.push_str(&format!(
        "  Updated: {}\n\n",
        snapshot.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use toonledger_cost::{CallDescriptor, CostTracker, TrackerConfig};

    #[tokio::test]
    async fn test_render_snapshot_written_by_tracker() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("live_cost.json");
        let tracker = CostTracker::new(
            TrackerConfig::default()
                .with_session_id("show-test")
                .with_snapshot_path(&path),
        );
        tracker
            .record(
                CallDescriptor::success("fal-ai/flux-pro/kontext", "s1_p01")
                    .with_phase("panel_generation"),
            )
            .await;

        let snapshot = read_live(&path).await.unwrap();
        let table = render_table(&snapshot);

        assert!(table.contains("Live Cost - show-test"));
        assert!(table.contains("Total: $0.0400 / $50.00 (0.1%)"));
        assert!(table.contains("Last:  s1_p01 fal-ai/flux-pro/kontext $0.0400 [success]"));
        assert!(table.contains("kontext"));
        assert!(table.contains("panel_generation"));
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = run(&dir.path().join("absent.json"), false, false, 1).await;
        assert!(result.is_err());
    }
}
