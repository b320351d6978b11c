use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequential trade identifier, unique within one backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TradeId(pub u64);

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Monotonic trade ID generator.
#[derive(Debug, Default)]
pub struct IdGen {
    next_trade: u64,
}

impl IdGen {
    pub fn next_trade_id(&mut self) -> TradeId {
        self.next_trade += 1;
        TradeId(self.next_trade)
    }
}
