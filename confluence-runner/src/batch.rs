//! Parallel backtests over (symbol × profile) jobs.
//!
//! Candle data is loaded once per symbol and shared read-only behind an
//! `Arc`; each job builds its own `Simulator`. One `AtomicBool` cancels every
//! job still running. Outcomes come back in job order regardless of which
//! thread finished first.

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use confluence_core::analysis::AnalysisConfig;
use confluence_core::backtest::{BacktestConfig, BacktestError, BacktestResult, SimulationData, Simulator};
use confluence_core::strategy::StrategyProfile;

/// One simulator run to perform.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub profile: StrategyProfile,
    pub data: Arc<SimulationData>,
}

impl BatchJob {
    pub fn new(profile: StrategyProfile, data: Arc<SimulationData>) -> Self {
        Self { profile, data }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub symbol: String,
    pub profile: String,
    pub result: Result<BacktestResult, BacktestError>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Every (symbol, profile) pairing, symbols outermost.
pub fn cartesian_jobs(
    datasets: &[Arc<SimulationData>],
    profiles: &[StrategyProfile],
) -> Vec<BatchJob> {
    datasets
        .iter()
        .flat_map(|data| {
            profiles
                .iter()
                .map(move |p| BatchJob::new(p.clone(), Arc::clone(data)))
        })
        .collect()
}

/// Run `jobs` in parallel. A failed job does not stop the others; a set
/// `cancel` flag stops all of them at their next driver bar.
pub fn run_batch(
    jobs: &[BatchJob],
    analysis: &AnalysisConfig,
    backtest: &BacktestConfig,
    cancel: &AtomicBool,
) -> Vec<BatchOutcome> {
    info!(jobs = jobs.len(), "batch started");

    let outcomes: Vec<BatchOutcome> = jobs
        .par_iter()
        .map(|job| {
            let result = Simulator::new(job.profile.clone(), analysis.clone(), backtest.clone())
                .and_then(|sim| sim.run_with_cancel(&job.data, cancel));
            if let Err(e) = &result {
                warn!(
                    symbol = job.data.symbol(),
                    profile = job.profile.name(),
                    error = %e,
                    "backtest failed"
                );
            }
            BatchOutcome {
                symbol: job.data.symbol().to_string(),
                profile: job.profile.name().to_string(),
                result,
            }
        })
        .collect();

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    info!(
        jobs = outcomes.len(),
        failed,
        cancelled = cancel.load(Ordering::Relaxed),
        "batch finished"
    );
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::generate_synthetic;
    use confluence_core::strategy::ProfileKind;

    fn synthetic(symbol: &str, profile: &StrategyProfile) -> Arc<SimulationData> {
        let raw = generate_synthetic(symbol, 1, 80, &profile.timeframes());
        Arc::new(SimulationData::from_raw(symbol, raw).unwrap())
    }

    #[test]
    fn jobs_pair_every_symbol_with_every_profile() {
        let medium = StrategyProfile::builtin(ProfileKind::Medium);
        let fast = StrategyProfile::builtin(ProfileKind::Fast);
        let data = vec![synthetic("A", &medium), synthetic("B", &medium)];
        let jobs = cartesian_jobs(&data, &[medium, fast]);
        let pairs: Vec<_> = jobs
            .iter()
            .map(|j| (j.data.symbol().to_string(), j.profile.name().to_string()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("A".into(), "medium".into()),
                ("A".into(), "fast".into()),
                ("B".into(), "medium".into()),
                ("B".into(), "fast".into()),
            ]
        );
        assert!(Arc::ptr_eq(&jobs[0].data, &jobs[1].data));
    }

    #[test]
    fn failed_job_does_not_stop_the_others() {
        let medium = StrategyProfile::builtin(ProfileKind::Medium);
        let fast = StrategyProfile::builtin(ProfileKind::Fast);
        // medium-only timeframes: fast is missing 5m
        let jobs = cartesian_jobs(&[synthetic("A", &medium)], &[medium, fast]);
        let out = run_batch(
            &jobs,
            &AnalysisConfig::default(),
            &BacktestConfig::default(),
            &AtomicBool::new(false),
        );
        assert_eq!(out.len(), 2);
        assert!(out[0].is_ok());
        assert!(matches!(
            out[1].result,
            Err(BacktestError::MissingTimeframe { .. })
        ));
    }

    #[test]
    fn cancel_flag_reaches_every_job() {
        let medium = StrategyProfile::builtin(ProfileKind::Medium);
        let data = vec![synthetic("A", &medium), synthetic("B", &medium)];
        let jobs = cartesian_jobs(&data, &[medium]);
        let out = run_batch(
            &jobs,
            &AnalysisConfig::default(),
            &BacktestConfig::default(),
            &AtomicBool::new(true),
        );
        assert!(out
            .iter()
            .all(|o| matches!(o.result, Err(BacktestError::Cancelled { .. }))));
    }
}
