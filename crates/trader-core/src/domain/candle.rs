//! OHLCV 캔들 타입.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::time::format_millis;
use crate::{CoreError, CoreResult};

/// 단일 OHLCV 관측치.
///
/// `timestamp_ms`는 캔들 시작 시각(UTC epoch 밀리초)이며 시리즈 내 고유 키입니다.
/// 파싱 이후에는 변경하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// 시작 시각 (UTC epoch ms)
    pub timestamp_ms: i64,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    pub volume: Decimal,
}

impl Candle {
    /// 새 캔들 생성 (검증 없음).
    pub fn new(
        timestamp_ms: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            timestamp_ms,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// 검증된 캔들 생성.
    pub fn try_new(
        timestamp_ms: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> CoreResult<Self> {
        let candle = Self::new(timestamp_ms, open, high, low, close, volume);
        candle.validate()?;
        Ok(candle)
    }

    /// OHLCV 관계 검증.
    ///
    /// `low <= open, close <= high`, `volume >= 0`, 가격은 음수 불가.
    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |reason: &str| CoreError::InvalidCandle {
            timestamp_ms: self.timestamp_ms,
            reason: reason.to_string(),
        };

        if self.low < Decimal::ZERO {
            return Err(invalid("음수 가격"));
        }
        if self.low > self.high {
            return Err(invalid("low > high"));
        }
        if self.open < self.low || self.open > self.high {
            return Err(invalid("open이 [low, high] 범위 밖"));
        }
        if self.close < self.low || self.close > self.high {
            return Err(invalid("close가 [low, high] 범위 밖"));
        }
        if self.volume < Decimal::ZERO {
            return Err(invalid("음수 거래량"));
        }

        Ok(())
    }

    /// 사람이 읽을 수 있는 시작 시각 (`YYYY-MM-DD HH:MM:SS`, UTC).
    pub fn open_time(&self) -> String {
        format_millis(self.timestamp_ms)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_valid_candle() {
        let candle = Candle::try_new(
            1_704_067_200_000,
            dec!(100),
            dec!(110),
            dec!(95),
            dec!(105),
            dec!(12.5),
        )
        .unwrap();

        assert_eq!(candle.open_time(), "2024-01-01 00:00:00");
    }

    #[test]
    fn test_invalid_relations() {
        // close > high
        let err = Candle::try_new(0, dec!(100), dec!(110), dec!(95), dec!(111), dec!(1));
        assert!(matches!(err, Err(CoreError::InvalidCandle { .. })));

        // low > high
        assert!(Candle::try_new(0, dec!(100), dec!(90), dec!(95), dec!(92), dec!(1)).is_err());

        // negative volume
        assert!(Candle::try_new(0, dec!(100), dec!(110), dec!(95), dec!(100), dec!(-1)).is_err());
    }

    #[test]
    fn test_flat_candle_is_valid() {
        assert!(Candle::try_new(0, dec!(1), dec!(1), dec!(1), dec!(1), dec!(0)).is_ok());
    }
}
