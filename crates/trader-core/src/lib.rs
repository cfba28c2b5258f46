//! 트레이딩 워크플로우 공용 도메인 타입.
//!
//! 캔들 수집기와 백테스터가 공유하는 타입을 제공합니다.
//!
//! - [`Candle`]: 단일 OHLCV 관측치
//! - [`Interval`]: 캔들 간격 토큰 (`"60"`, `"D"`, `"W"`, `"M"`)
//! - [`WalletBalance`], [`ExchangePosition`]: 거래소 계좌 스냅샷
//! - [`time`]: UTC 밀리초 ↔ 문자열 변환 유틸리티

pub mod domain;
pub mod error;
pub mod time;

pub use domain::{
    Candle, ExchangePosition, Interval, PositionSide, WalletBalance, WalletHolding,
};
pub use error::{CoreError, CoreResult};
