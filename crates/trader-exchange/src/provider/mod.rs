//! 거래소 중립 provider trait과 구현체.
//!
//! # Provider 구조
//!
//! - [`KlineSource`]: 과거 캔들 한 페이지 조회
//! - [`AccountProvider`]: 포지션/잔고 조회 및 포지션 청산
//! - [`BybitExchangeProvider`]: 두 trait의 Bybit 구현

mod account;
mod bybit;
mod kline;

pub use account::{close_all_positions, AccountProvider, CloseSummary};
pub use bybit::BybitExchangeProvider;
pub use kline::{KlinePageRequest, KlineSource};
