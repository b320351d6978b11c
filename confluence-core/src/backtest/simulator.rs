//! Bar-by-bar replay of the evaluator over history.
//!
//! Per driver bar:
//! 1. In position: check the bar's range against stop then target.
//! 2. Flat: build the as-of view, evaluate, open at the bar close if valid,
//!    with targets placed at the profile R multiples from that close.
//!
//! At most one trade is open at a time. Nothing a single bar does can abort
//! the run; bars that cannot be processed are recorded as skipped.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use super::config::BacktestConfig;
use super::data::SimulationData;
use super::error::{BacktestError, SkipKind, SkippedStep};
use super::stats::{equity_curve, BacktestStats};
use super::BacktestResult;
use crate::analysis::AnalysisConfig;
use crate::domain::{Candle, ClosedTrade, ExitType, IdGen, Side, Trade};
use crate::strategy::{evaluate, NoSignalReason, StrategyProfile};

#[derive(Debug, Clone)]
pub struct Simulator {
    profile: StrategyProfile,
    analysis: AnalysisConfig,
    config: BacktestConfig,
}

impl Simulator {
    pub fn new(
        profile: StrategyProfile,
        analysis: AnalysisConfig,
        config: BacktestConfig,
    ) -> Result<Self, BacktestError> {
        analysis.validate()?;
        config.validate()?;
        check_entry_tolerance(&profile, &analysis)?;
        Ok(Self {
            profile,
            analysis,
            config,
        })
    }

    pub fn profile(&self) -> &StrategyProfile {
        &self.profile
    }

    pub fn analysis(&self) -> &AnalysisConfig {
        &self.analysis
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// First driver bar that is evaluated.
    pub fn warmup(&self) -> usize {
        self.config
            .warmup_bars
            .max(self.analysis.min_candles().saturating_sub(1))
    }

    pub fn run(&self, data: &SimulationData) -> Result<BacktestResult, BacktestError> {
        self.run_with_cancel(data, &AtomicBool::new(false))
    }

    /// Run, polling `cancel` once per driver bar.
    pub fn run_with_cancel(
        &self,
        data: &SimulationData,
        cancel: &AtomicBool,
    ) -> Result<BacktestResult, BacktestError> {
        data.validate_for(&self.profile)?;
        let driver_tf = self.profile.primary_anchor();
        let candles: &[Candle] = data
            .series(driver_tf)
            .map(|s| s.candles())
            .unwrap_or_default();
        let timeframes = self.profile.timeframes();
        let warmup = self.warmup();
        let target_index = self.config.exit_target_index();

        info!(
            symbol = data.symbol(),
            profile = self.profile.name(),
            driver = %driver_tf,
            bars = candles.len(),
            warmup,
            "backtest started"
        );

        let mut ids = IdGen::default();
        let mut open: Option<Trade> = None;
        let mut trades: Vec<ClosedTrade> = Vec::new();
        let mut skipped: Vec<SkippedStep> = Vec::new();
        let mut bars_evaluated = 0usize;
        let mut signals_valid = 0usize;

        for (i, bar) in candles.iter().enumerate().skip(warmup) {
            if cancel.load(Ordering::Relaxed) {
                info!(symbol = data.symbol(), bar = i, "backtest cancelled");
                return Err(BacktestError::Cancelled { bar: i });
            }

            // ─── IN_POSITION: exit check only ───
            if let Some(trade) = open.take() {
                match check_exit(&trade, bar, target_index) {
                    Some((price, exit_type)) => {
                        let closed = trade.close(i, bar.timestamp, price, exit_type);
                        debug!(
                            trade = %closed.trade.id,
                            exit = exit_type.as_str(),
                            r = closed.r_multiple,
                            "trade closed"
                        );
                        trades.push(closed);
                    }
                    None => open = Some(trade),
                }
                continue;
            }

            // ─── NO_POSITION: evaluate the as-of view ───
            let view = data.view_at(&timeframes, driver_tf, bar.timestamp, &self.analysis);
            let signal = evaluate(&view, &self.profile);
            bars_evaluated += 1;

            if let Some(NoSignalReason::AnalysisFailed { timeframe, detail }) = &signal.rejection {
                warn!(bar = i, %timeframe, detail = detail.as_str(), "skipping bar");
                skipped.push(SkippedStep {
                    bar: i,
                    timestamp: bar.timestamp,
                    kind: SkipKind::AnalysisFailed,
                    detail: signal.reason.clone(),
                });
                continue;
            }
            let (Some(side), Some(stop)) = (signal.side(), signal.stop_loss) else {
                continue;
            };
            signals_valid += 1;

            // The signal prices its targets off the anchor; re-place them at
            // the profile's R multiples from the actual fill.
            let fill = bar.close;
            let targets = targets_from_fill(side, fill, stop, self.profile.risk_reward_targets());
            if signal.entry_price != Some(fill) {
                debug!(
                    bar = i,
                    signal_entry = ?signal.entry_price,
                    fill,
                    "targets re-placed from fill"
                );
            }

            match Trade::open(
                ids.next_trade_id(),
                side,
                i,
                bar.timestamp,
                fill,
                stop,
                targets,
                signal.confidence,
            ) {
                Ok(trade) => {
                    debug!(
                        trade = %trade.id,
                        %side,
                        entry = trade.entry_price,
                        stop = trade.stop_loss,
                        "trade opened"
                    );
                    open = Some(trade);
                }
                Err(e) => {
                    warn!(bar = i, error = %e, "valid signal could not open a trade");
                    skipped.push(SkippedStep {
                        bar: i,
                        timestamp: bar.timestamp,
                        kind: SkipKind::TradeGeometry,
                        detail: e.to_string(),
                    });
                }
            }
        }

        // ─── End of data ───
        if let (Some(trade), Some(last)) = (open.take(), candles.last()) {
            let closed = trade.force_close(candles.len() - 1, last.timestamp, last.close);
            debug!(trade = %closed.trade.id, "trade force-closed at end of data");
            trades.push(closed);
        }

        let stats = BacktestStats::compute(&trades);
        info!(
            symbol = data.symbol(),
            profile = self.profile.name(),
            trades = stats.trade_count,
            total_r = stats.total_r,
            skipped = skipped.len(),
            "backtest finished"
        );

        Ok(BacktestResult {
            symbol: data.symbol().to_string(),
            profile: self.profile.name().to_string(),
            driver_timeframe: driver_tf,
            config: self.config.clone(),
            bars_total: candles.len(),
            warmup_bars: warmup,
            bars_evaluated,
            signals_valid,
            equity_curve: equity_curve(&trades),
            stats,
            trades,
            skipped,
            rejected_candles: data.rejected().to_vec(),
        })
    }
}

/// Exit level and type if the bar's range reaches the stop or the target.
/// The pullback classification and the signal's entry zone share one band.
pub fn check_entry_tolerance(
    profile: &StrategyProfile,
    analysis: &AnalysisConfig,
) -> Result<(), BacktestError> {
    if profile.entry_tolerance_pct() == analysis.entry_tolerance_pct {
        return Ok(());
    }
    Err(BacktestError::ToleranceMismatch {
        profile: profile.name().to_string(),
        profile_pct: profile.entry_tolerance_pct(),
        analysis_pct: analysis.entry_tolerance_pct,
    })
}

/// Profit targets at `r` multiples of the fill-to-stop distance.
pub fn targets_from_fill(side: Side, fill: f64, stop: f64, multiples: &[f64]) -> Vec<f64> {
    let risk = (fill - stop).abs();
    multiples
        .iter()
        .map(|r| fill + side.sign() * r * risk)
        .collect()
}

/// The stop is checked first: when both are in range the loss is assumed.
/// A trade without targets can only leave through the stop.
pub fn check_exit(trade: &Trade, bar: &Candle, target_index: usize) -> Option<(f64, ExitType)> {
    let stop_hit = match trade.direction {
        Side::Long => bar.low <= trade.stop_loss,
        Side::Short => bar.high >= trade.stop_loss,
    };
    if stop_hit {
        return Some((trade.stop_loss, ExitType::StopLoss));
    }
    let target = trade.exit_target(target_index)?;
    let target_hit = match trade.direction {
        Side::Long => bar.high >= target,
        Side::Short => bar.low <= target,
    };
    target_hit.then_some((target, ExitType::TakeProfit))
}
