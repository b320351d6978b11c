//! Simulator knobs that are not part of the strategy profile.

use serde::{Deserialize, Serialize};

use super::error::BacktestError;

fn default_exit_target() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Driver bars skipped before the first evaluation. Raised to the
    /// analysis minimum when smaller.
    pub warmup_bars: usize,
    /// 1-based target used for take-profit exits (1 = tp1). Values past the
    /// last target use the last one.
    #[serde(default = "default_exit_target")]
    pub exit_target: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            warmup_bars: 0,
            exit_target: default_exit_target(),
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.exit_target == 0 {
            return Err(BacktestError::ExitTarget(self.exit_target));
        }
        Ok(())
    }

    /// Zero-based index into a trade's target list.
    pub fn exit_target_index(&self) -> usize {
        self.exit_target.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_exits_at_tp1() {
        let cfg = BacktestConfig::default();
        assert_eq!(cfg.exit_target, 1);
        assert_eq!(cfg.exit_target_index(), 0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_exit_target_is_rejected() {
        let cfg = BacktestConfig {
            exit_target: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(BacktestError::ExitTarget(0)));
    }
}
