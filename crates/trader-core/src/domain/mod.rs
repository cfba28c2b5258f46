//! 도메인 모델.

mod account;
mod candle;
mod interval;

pub use account::{ExchangePosition, PositionSide, WalletBalance, WalletHolding};
pub use candle::Candle;
pub use interval::Interval;
