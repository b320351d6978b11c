//! Multi-timeframe strategy evaluation.
//!
//! Profiles are data. The evaluator walks a fixed gate → confirm → entry →
//! score pipeline over a `MarketView` and returns a `Signal`; every NONE
//! carries a `NoSignalReason` naming what failed.

pub mod evaluator;
pub mod profile;
pub mod session;
pub mod signal;
pub mod view;

pub use evaluator::evaluate;
pub use profile::{ProfileConfig, ProfileError, ProfileKind, StrategyProfile};
pub use session::Session;
pub use signal::{EntryZone, NoSignalReason, Signal};
pub use view::{MarketView, TimeframeState};
