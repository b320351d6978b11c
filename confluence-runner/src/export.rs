//! Reporting and export — JSON, CSV, and Markdown artifact generation.
//!
//! - **JSON**: full round-trip serialization of a `RunReport` or `ScanReport`
//!   with schema versioning
//! - **CSV**: trade ledger and R equity curve for external tools
//! - **Markdown**: a human-readable single-run report
//!
//! Persisted artifacts carry `schema_version`; versions newer than this build
//! understands are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use confluence_core::backtest::EquityPoint;
use confluence_core::domain::ClosedTrade;

use crate::runner::{RunReport, ScanReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `RunReport` to pretty JSON.
pub fn export_json(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize RunReport to JSON")
}

/// Deserialize a `RunReport`, rejecting schema versions from the future.
pub fn import_json(json: &str) -> Result<RunReport> {
    let report: RunReport =
        serde_json::from_str(json).context("failed to deserialize RunReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

pub fn export_scan_json(report: &ScanReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize ScanReport to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the trade ledger as CSV, one row per closed trade.
///
/// Columns: id, direction, entry_bar, entry_time, entry_price, stop_loss,
/// exit_target_price, confidence, exit_bar, exit_time, exit_price, exit_type,
/// r_multiple, bars_held. A trade without targets leaves exit_target_price empty.
pub fn export_trades_csv(trades: &[ClosedTrade], exit_target: usize) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "id",
        "direction",
        "entry_bar",
        "entry_time",
        "entry_price",
        "stop_loss",
        "exit_target_price",
        "confidence",
        "exit_bar",
        "exit_time",
        "exit_price",
        "exit_type",
        "r_multiple",
        "bars_held",
    ])?;

    for t in trades {
        let entry = &t.trade;
        let target = entry
            .exit_target(exit_target.saturating_sub(1))
            .map(|p| format!("{p:.6}"))
            .unwrap_or_default();
        wtr.write_record([
            &entry.id.to_string(),
            &entry.direction.to_string(),
            &entry.entry_bar.to_string(),
            &entry.entry_time.to_rfc3339(),
            &format!("{:.6}", entry.entry_price),
            &format!("{:.6}", entry.stop_loss),
            &target,
            &format!("{:.4}", entry.confidence),
            &t.exit_bar.to_string(),
            &t.exit_time.to_rfc3339(),
            &format!("{:.6}", t.exit_price),
            t.exit_type.as_str(),
            &format!("{:.4}", t.r_multiple),
            &t.bars_held.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the cumulative-R equity curve, one row per closed trade.
pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["trade_id", "time", "equity_r", "drawdown_r"])?;
    for p in equity_curve {
        wtr.write_record([
            &p.trade_id.to_string(),
            &p.time.to_rfc3339(),
            &format!("{:.4}", p.equity_r),
            &format!("{:.4}", p.drawdown_r),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Directory name for a report: `{symbol}_{profile}_{short run id}`.
///
/// Deterministic, so re-running an identical config overwrites in place.
pub fn artifact_dir_name(report: &RunReport) -> String {
    let clean = |s: &str| -> String {
        s.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect()
    };
    format!(
        "{}_{}_{}",
        clean(&report.result.symbol),
        clean(&report.result.profile),
        report.fingerprint.short_id()
    )
}

/// Save the full artifact set for one run under `output_dir`:
/// - `manifest.json`: the full `RunReport`
/// - `trades.csv`: trade ledger
/// - `equity.csv`: cumulative R per closed trade
/// - `report.md`: Markdown summary
///
/// Returns the created directory.
pub fn save_artifacts(report: &RunReport, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(artifact_dir_name(report));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let write = |name: &str, contents: &str| -> Result<()> {
        let path = run_dir.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))
    };

    write("manifest.json", &export_json(report)?)?;
    write(
        "trades.csv",
        &export_trades_csv(&report.result.trades, report.result.config.exit_target)?,
    )?;
    write("equity.csv", &export_equity_csv(&report.result.equity_curve)?)?;
    write("report.md", &generate_report(report))?;

    Ok(run_dir)
}

/// Load a `RunReport` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<RunReport> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Generate a Markdown report for a single run.
pub fn generate_report(report: &RunReport) -> String {
    let r = &report.result;
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbol | {} |\n", r.symbol));
    md.push_str(&format!("| Profile | {} |\n", r.profile));
    md.push_str(&format!("| Driver | {} |\n", r.driver_timeframe));
    md.push_str(&format!(
        "| Bars | {} ({} warmup, {} evaluated) |\n",
        r.bars_total, r.warmup_bars, r.bars_evaluated
    ));
    md.push_str(&format!("| Valid Signals | {} |\n", r.signals_valid));
    md.push_str(&format!("| Exit Target | tp{} |\n", r.config.exit_target));
    md.push_str(&format!("| Run ID | {} |\n", report.fingerprint.run_id));
    md.push_str(&format!(
        "| Dataset Hash | {} |\n",
        report.fingerprint.dataset_hash
    ));
    if report.synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    let s = &r.stats;
    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Trades | {} |\n", s.trade_count));
    md.push_str(&format!("| Wins / Losses | {} / {} |\n", s.wins, s.losses));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", s.win_rate * 100.0));
    md.push_str(&format!("| Total R | {:.2} |\n", s.total_r));
    md.push_str(&format!("| Average R | {:.3} |\n", s.average_r));
    md.push_str(&format!("| Expectancy R | {:.3} |\n", s.expectancy_r));
    md.push_str(&format!("| Profit Factor | {:.2} |\n", s.profit_factor));
    md.push_str(&format!("| Max Drawdown R | {:.2} |\n", s.max_drawdown_r));
    md.push_str(&format!(
        "| Largest Win / Loss R | {:.2} / {:.2} |\n",
        s.largest_win_r, s.largest_loss_r
    ));
    md.push_str(&format!(
        "| Max Consecutive Losses | {} |\n",
        s.max_consecutive_losses
    ));
    md.push('\n');

    if !r.skipped.is_empty() || !r.rejected_candles.is_empty() {
        md.push_str("## Data Quality\n\n");
        md.push_str(&format!("- Skipped bars: {}\n", r.skipped.len()));
        md.push_str(&format!(
            "- Rejected candles: {}\n",
            r.rejected_candles.len()
        ));
        for step in r.skipped.iter().take(10) {
            md.push_str(&format!(
                "  - bar {} ({}): {}\n",
                step.bar, step.timestamp, step.detail
            ));
        }
        md.push('\n');
    }

    md
}
