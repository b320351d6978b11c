//! Domain types for Confluence

pub mod candle;
pub mod direction;
pub mod ids;
pub mod resample;
pub mod series;
pub mod timeframe;
pub mod trade;

pub use candle::{Candle, CandleRejection};
pub use direction::{Direction, Side};
pub use ids::{IdGen, TradeId};
pub use resample::{bucket_start, resample};
pub use series::{CandleSeries, RejectedCandle, SeriesError};
pub use timeframe::{ParseTimeframeError, Timeframe};
pub use trade::{ClosedTrade, ExitType, Trade, TradeError, TradeState};
