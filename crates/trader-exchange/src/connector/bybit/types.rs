//! Bybit v5 API 응답 타입.
//!
//! 모든 응답은 `{retCode, retMsg, result}` 봉투(envelope)로 감싸져 있으며,
//! 숫자 필드는 문자열로 전달됩니다.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use trader_core::{Candle, ExchangePosition, PositionSide, WalletHolding};

use crate::ExchangeError;

/// 요청 한도 초과 응답 코드.
pub const RET_CODE_RATE_LIMIT: i64 = 10006;

/// 인증 관련 응답 코드 (잘못된 키, 서명 오류, 권한 없음).
pub const RET_CODES_AUTH: [i64; 4] = [10003, 10004, 10005, 10010];

// ============================================================================
// 공통 봉투
// ============================================================================

/// `{retCode, retMsg, result}` 응답 봉투.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitResponse<T> {
    pub ret_code: i64,
    #[serde(default)]
    pub ret_msg: String,
    pub result: Option<T>,
}

// ============================================================================
// Kline
// ============================================================================

/// `/v5/market/kline` 결과.
///
/// `list`의 각 행은 `[startTime, open, high, low, close, volume, turnover]`이며
/// 최신 캔들이 먼저 옵니다.
#[derive(Debug, Deserialize)]
pub struct KlineResult {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub list: Vec<Vec<String>>,
}

/// kline 행 하나를 검증된 캔들로 변환.
pub fn parse_kline_row(row: &[String]) -> Result<Candle, ExchangeError> {
    if row.len() < 6 {
        return Err(ExchangeError::ParseError(format!(
            "kline 행 필드 부족: {}개 (최소 6개)",
            row.len()
        )));
    }

    let timestamp_ms = row[0]
        .parse::<i64>()
        .map_err(|e| ExchangeError::ParseError(format!("startTime '{}': {}", row[0], e)))?;

    let field = |idx: usize, name: &str| -> Result<Decimal, ExchangeError> {
        Decimal::from_str(&row[idx])
            .map_err(|e| ExchangeError::ParseError(format!("{} '{}': {}", name, row[idx], e)))
    };

    Candle::try_new(
        timestamp_ms,
        field(1, "open")?,
        field(2, "high")?,
        field(3, "low")?,
        field(4, "close")?,
        field(5, "volume")?,
    )
    .map_err(|e| ExchangeError::ParseError(e.to_string()))
}

// ============================================================================
// 포지션
// ============================================================================

/// `/v5/position/list` 결과.
#[derive(Debug, Deserialize)]
pub struct PositionListResult {
    #[serde(default)]
    pub list: Vec<BybitPosition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitPosition {
    pub symbol: String,
    /// "Buy" / "Sell" / "" (포지션 없음)
    #[serde(default)]
    pub side: String,
    pub size: String,
    #[serde(default)]
    pub avg_price: String,
    #[serde(default)]
    pub mark_price: String,
    #[serde(default)]
    pub unrealised_pnl: String,
}

impl BybitPosition {
    /// 중립 포지션 타입으로 변환. 방향이 없으면 `None`.
    pub fn into_position(self) -> Result<Option<ExchangePosition>, ExchangeError> {
        let side = match self.side.as_str() {
            "Buy" => PositionSide::Buy,
            "Sell" => PositionSide::Sell,
            _ => return Ok(None),
        };

        Ok(Some(ExchangePosition {
            size: parse_decimal(&self.size, "size")?,
            avg_price: parse_decimal_or_zero(&self.avg_price),
            mark_price: parse_decimal_or_zero(&self.mark_price),
            unrealised_pnl: parse_decimal_or_zero(&self.unrealised_pnl),
            symbol: self.symbol,
            side,
        }))
    }
}

// ============================================================================
// 지갑 잔고
// ============================================================================

/// `/v5/account/wallet-balance` 결과.
#[derive(Debug, Deserialize)]
pub struct WalletBalanceResult {
    #[serde(default)]
    pub list: Vec<BybitWalletAccount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitWalletAccount {
    pub account_type: String,
    #[serde(default)]
    pub total_equity: String,
    #[serde(default)]
    pub coin: Vec<BybitCoin>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitCoin {
    pub coin: String,
    #[serde(default)]
    pub equity: String,
    #[serde(default)]
    pub wallet_balance: String,
    #[serde(default)]
    pub usd_value: String,
}

impl From<BybitCoin> for WalletHolding {
    fn from(c: BybitCoin) -> Self {
        Self {
            equity: parse_decimal_or_zero(&c.equity),
            wallet_balance: parse_decimal_or_zero(&c.wallet_balance),
            usd_value: parse_decimal_or_zero(&c.usd_value),
            coin: c.coin,
        }
    }
}

// ============================================================================
// 주문
// ============================================================================

/// `/v5/order/create` 요청 본문.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub category: String,
    pub symbol: String,
    pub side: String,
    pub order_type: String,
    pub qty: String,
    pub reduce_only: bool,
}

/// `/v5/order/create` 결과.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResult {
    pub order_id: String,
    #[serde(default)]
    pub order_link_id: String,
}

// ============================================================================
// 숫자 파싱
// ============================================================================

fn parse_decimal(value: &str, name: &str) -> Result<Decimal, ExchangeError> {
    Decimal::from_str(value)
        .map_err(|e| ExchangeError::ParseError(format!("{} '{}': {}", name, value, e)))
}

/// 빈 문자열이나 파싱 불가 값은 0으로 취급.
fn parse_decimal_or_zero(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_kline_row() {
        let candle = parse_kline_row(&row(&[
            "1704067200000",
            "42000.5",
            "42100",
            "41900",
            "42050",
            "12.3",
            "517000",
        ]))
        .unwrap();

        assert_eq!(candle.timestamp_ms, 1_704_067_200_000);
        assert_eq!(candle.open, dec!(42000.5));
        assert_eq!(candle.volume, dec!(12.3));
    }

    #[test]
    fn test_parse_kline_row_rejects_malformed() {
        assert!(parse_kline_row(&row(&["1", "2", "3"])).is_err());
        assert!(parse_kline_row(&row(&["abc", "1", "1", "1", "1", "1"])).is_err());
        assert!(parse_kline_row(&row(&["1", "1", "x", "1", "1", "1"])).is_err());
        // high < low
        assert!(matches!(
            parse_kline_row(&row(&["1", "10", "9", "11", "10", "1"])),
            Err(ExchangeError::ParseError(_))
        ));
    }

    #[test]
    fn test_position_conversion() {
        let raw = BybitPosition {
            symbol: "ETHUSDT".into(),
            side: "Sell".into(),
            size: "1.5".into(),
            avg_price: "2200".into(),
            mark_price: "".into(),
            unrealised_pnl: "-3.2".into(),
        };
        let position = raw.into_position().unwrap().unwrap();
        assert_eq!(position.side, PositionSide::Sell);
        assert_eq!(position.size, dec!(1.5));
        assert_eq!(position.mark_price, Decimal::ZERO);

        let empty = BybitPosition {
            symbol: "BTCUSDT".into(),
            side: "".into(),
            size: "0".into(),
            avg_price: "".into(),
            mark_price: "".into(),
            unrealised_pnl: "".into(),
        };
        assert!(empty.into_position().unwrap().is_none());
    }
}
