//! 거래소 계좌 스냅샷 타입.
//!
//! 파생상품 포지션과 지갑 잔고를 거래소 응답과 독립적인 형식으로 표현합니다.
//! 커넥터는 자체 응답 타입을 이 타입으로 변환합니다.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// 포지션 (ExchangePosition)
// =============================================================================

/// 포지션 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    /// 롱
    Buy,
    /// 숏
    Sell,
}

impl PositionSide {
    /// 반대 방향 (청산 주문 방향).
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// 거래소 API 표기 (`"Buy"` / `"Sell"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "Buy",
            Self::Sell => "Sell",
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 거래소에 열려 있는 파생상품 포지션.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangePosition {
    /// 심볼 (예: "BTCUSDT")
    pub symbol: String,
    /// 방향
    pub side: PositionSide,
    /// 수량 (항상 양수, 0이면 포지션 없음)
    pub size: Decimal,
    /// 평균 진입가
    pub avg_price: Decimal,
    /// 마크 가격
    pub mark_price: Decimal,
    /// 미실현 손익
    pub unrealised_pnl: Decimal,
}

impl ExchangePosition {
    /// 청산 대상 여부 (수량이 0보다 큼).
    pub fn is_open(&self) -> bool {
        self.size > Decimal::ZERO
    }

    /// 포지션 명목 가치 (size * mark_price).
    pub fn notional(&self) -> Decimal {
        self.size * self.mark_price
    }
}

// =============================================================================
// 지갑 잔고 (WalletBalance)
// =============================================================================

/// 코인별 지갑 보유량.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletHolding {
    /// 코인 (예: "USDT", "BTC")
    pub coin: String,
    /// 자산 평가액 (코인 단위)
    pub equity: Decimal,
    /// 지갑 잔고 (코인 단위)
    pub wallet_balance: Decimal,
    /// USD 환산 가치
    pub usd_value: Decimal,
}

/// 계좌 전체 지갑 잔고.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBalance {
    /// 거래소 이름 (예: "Bybit")
    pub exchange: String,
    /// 계좌 유형 (예: "UNIFIED")
    pub account_type: String,
    /// 코인별 보유량
    pub holdings: Vec<WalletHolding>,
    /// 거래소가 보고한 총 평가액 (USD)
    pub total_equity_usd: Option<Decimal>,
}

impl WalletBalance {
    /// 빈 잔고 생성.
    pub fn new(exchange: impl Into<String>, account_type: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            account_type: account_type.into(),
            holdings: Vec::new(),
            total_equity_usd: None,
        }
    }

    /// 보유 코인 추가.
    pub fn add_holding(&mut self, holding: WalletHolding) {
        self.holdings.push(holding);
    }

    /// USD 가치 합계.
    ///
    /// 거래소가 총액을 보고했으면 그 값을, 아니면 코인별 합계를 사용합니다.
    pub fn total_usd(&self) -> Decimal {
        self.total_equity_usd
            .unwrap_or_else(|| self.holdings.iter().map(|h| h.usd_value).sum())
    }

    /// 잔고가 있는 코인만 반환.
    pub fn non_zero(&self) -> impl Iterator<Item = &WalletHolding> {
        self.holdings
            .iter()
            .filter(|h| h.equity != Decimal::ZERO || h.wallet_balance != Decimal::ZERO)
    }
}
