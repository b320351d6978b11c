//! Confluence CLI — backtests and signal scans from a TOML run config.
//!
//! Commands:
//! - `backtest` — run every configured (symbol × profile) pair, print a summary,
//!   optionally save artifacts
//! - `signal` — evaluate the latest as-of view per pair and print JSON
//! - `profiles` — print the built-in strategy profiles as `[profile]` tables
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use confluence_core::strategy::{ProfileConfig, ProfileKind};
use confluence_runner::export::{export_scan_json, save_artifacts};
use confluence_runner::{run_backtests, scan_signals, RunConfig, RunReport};

#[derive(Parser)]
#[command(
    name = "confluence",
    about = "Confluence CLI — multi-timeframe confluence signals and as-of backtests"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest every configured symbol against every configured profile.
    Backtest {
        /// Path to a TOML run config.
        #[arg(long)]
        config: PathBuf,

        /// Directory for manifest.json, trades.csv, equity.csv and report.md.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Evaluate the newest candles and print the signals as JSON.
    Signal {
        /// Path to a TOML run config.
        #[arg(long)]
        config: PathBuf,

        /// Write the JSON here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the built-in strategy profiles as TOML.
    Profiles,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest { config, out } => run_backtest_cmd(&config, out.as_deref()),
        Commands::Signal { config, out } => run_signal_cmd(&config, out.as_deref()),
        Commands::Profiles => {
            print!("{}", builtin_profiles_toml()?);
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn run_backtest_cmd(config_path: &Path, out: Option<&Path>) -> Result<()> {
    let config = RunConfig::load(config_path)?;
    let batch = run_backtests(&config)?;

    for report in &batch.reports {
        print_summary(report);
        if let Some(dir) = out {
            let run_dir = save_artifacts(report, dir)?;
            println!("Artifacts saved to: {}", run_dir.display());
        }
    }
    for failure in &batch.failures {
        eprintln!(
            "Error for {} / {}: {}",
            failure.symbol, failure.profile, failure.error
        );
    }

    if batch.reports.is_empty() {
        bail!("all {} backtests failed", batch.failures.len());
    }
    Ok(())
}

fn run_signal_cmd(config_path: &Path, out: Option<&Path>) -> Result<()> {
    let config = RunConfig::load(config_path)?;
    let scan = scan_signals(&config)?;
    let json = export_scan_json(&scan)?;

    match out {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Signals written to: {}", path.display());
        }
        None => println!("{json}"),
    }
    for error in &scan.errors {
        eprintln!("Error: {error}");
    }
    if scan.synthetic {
        eprintln!("WARNING: signals based on SYNTHETIC data");
    }
    Ok(())
}

#[derive(Serialize)]
struct ProfileTable {
    profile: ProfileConfig,
}

/// Each built-in profile as a `[profile]` table that a run config accepts.
fn builtin_profiles_toml() -> Result<String> {
    let mut text = String::new();
    for kind in ProfileKind::ALL {
        let table = ProfileTable {
            profile: kind.config(),
        };
        text.push_str(&format!("# {kind}\n"));
        text.push_str(&toml::to_string(&table).context("failed to render profile TOML")?);
        text.push('\n');
    }
    Ok(text)
}

fn print_summary(report: &RunReport) {
    let r = &report.result;
    let s = &r.stats;
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", r.symbol);
    println!("Profile:        {} (driver {})", r.profile, r.driver_timeframe);
    println!(
        "Bars:           {} ({} warmup, {} evaluated)",
        r.bars_total, r.warmup_bars, r.bars_evaluated
    );
    println!("Valid Signals:  {}", r.signals_valid);
    println!("Run ID:         {}", report.fingerprint.short_id());
    println!();
    println!("--- Performance (R) ---");
    println!("Trades:         {}", s.trade_count);
    println!("Win Rate:       {:.1}%", s.win_rate * 100.0);
    println!("Total R:        {:.2}", s.total_r);
    println!("Expectancy:     {:.3}", s.expectancy_r);
    println!("Profit Factor:  {:.2}", s.profit_factor);
    println!("Max Drawdown:   {:.2}", s.max_drawdown_r);
    println!("Max Consec Loss:{}", s.max_consecutive_losses);
    if !r.skipped.is_empty() {
        println!("WARNING: {} bars skipped", r.skipped.len());
    }
    if !r.rejected_candles.is_empty() {
        println!("WARNING: {} candles rejected", r.rejected_candles.len());
    }
    if report.synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn backtest_out_is_optional() {
        let cli = Cli::try_parse_from(["confluence", "backtest", "--config", "run.toml"]).unwrap();
        match cli.command {
            Commands::Backtest { config, out } => {
                assert_eq!(config, PathBuf::from("run.toml"));
                assert!(out.is_none());
            }
            _ => panic!("expected backtest"),
        }
        assert!(Cli::try_parse_from(["confluence", "signal"]).is_err());
    }

    #[test]
    fn printed_profiles_load_as_run_config() {
        let text = builtin_profiles_toml().unwrap();
        for section in text.split("# ").filter(|s| !s.trim().is_empty()) {
            let run = format!(
                "[run]\nsymbol = \"X\"\n\n[data]\nsynthetic = true\n\n{}",
                section.split_once('\n').unwrap().1
            );
            let config = RunConfig::from_toml_str(&run).unwrap();
            assert_eq!(config.profiles().unwrap().len(), 1);
        }
    }
}
