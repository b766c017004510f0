//! 공통 타입 정의.

pub mod market;
pub mod timeframe;

pub use market::{OhlcvBar, OrderBook, OrderBookLevel, Ticker};
pub use timeframe::{Timeframe, TimeframeError};
