//! 거래소 커넥터.
//!
//! Bybit v5 REST API 클라이언트와 거래소 중립 provider trait을 제공합니다.
//!
//! - [`provider::KlineSource`]: 과거 캔들 페이지 조회 (수집기가 사용)
//! - [`provider::AccountProvider`]: 포지션/잔고 조회 및 청산
//! - [`retry`]: 일시적 에러에 대한 재시도 정책

pub mod connector;
pub mod error;
pub mod provider;
pub mod retry;

pub use connector::bybit::{BybitClient, BybitCredentials};
pub use error::ExchangeError;
pub use provider::{
    close_all_positions, AccountProvider, BybitExchangeProvider, CloseSummary, KlinePageRequest,
    KlineSource,
};
pub use retry::{with_retry, with_retry_stats, RetryConfig, RetryStats};
