//! 과거 캔들 페이지 조회 trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use trader_core::{Candle, Interval};

use crate::ExchangeError;

/// kline 한 페이지 요청.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KlinePageRequest {
    /// 상품 카테고리 (예: "linear")
    pub category: String,
    /// 심볼 (예: "BTCUSDT")
    pub symbol: String,
    /// 캔들 간격
    pub interval: Interval,
    /// 페이지 시작 시각 (UTC epoch ms)
    pub start_ms: i64,
    /// 최대 캔들 수
    pub limit: u32,
}

/// 과거 캔들 소스.
///
/// 구현체는 한 번의 요청만 수행하며 재시도하지 않습니다.
/// 반환 순서는 보장하지 않습니다 (Bybit은 최신 캔들이 먼저 옵니다).
///
/// 에러 분류:
/// - [`ExchangeError::RateLimited`], [`ExchangeError::NetworkError`]: 재시도 대상
/// - [`ExchangeError::ParseError`]: 응답 형식 오류
/// - 그 외: 거래소 거부
#[async_trait]
pub trait KlineSource: Send + Sync {
    async fn fetch_kline_page(
        &self,
        request: &KlinePageRequest,
    ) -> Result<Vec<Candle>, ExchangeError>;
}
