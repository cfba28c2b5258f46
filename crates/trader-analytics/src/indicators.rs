//! Wilder 평활 지표.
//!
//! 외부 학습기가 쓰는 Python `ta` 라이브러리와 같은 Wilder 평활(α = 1/n) RSI/ATR.
//! `ta` 크레이트의 RSI/ATR은 EMA(α = 2/(n+1))로 평활하므로 값이 다릅니다.
//!
//! - [`WilderRsi`]: 첫 바의 변화량을 0으로 두고 α = 1/n 지수 평균. `n - 1`번째 바부터 정의.
//! - [`WilderAtr`]: 첫 `n`개 True Range 단순 평균으로 시작 후 `(prev * (n-1) + tr) / n`.
//!
//! 정의되지 않은 구간은 `NaN`을 반환합니다.

use ta::{Close, High, Low, Next};

use crate::features::FeatureError;

/// Wilder RSI.
#[derive(Debug, Clone)]
pub struct WilderRsi {
    period: usize,
    alpha: f64,
    prev_close: Option<f64>,
    avg_gain: f64,
    avg_loss: f64,
    count: usize,
}

impl WilderRsi {
    pub fn new(period: usize) -> Result<Self, FeatureError> {
        if period == 0 {
            return Err(FeatureError::Indicator("RSI period는 0보다 커야 합니다".to_string()));
        }
        Ok(Self {
            period,
            alpha: 1.0 / period as f64,
            prev_close: None,
            avg_gain: 0.0,
            avg_loss: 0.0,
            count: 0,
        })
    }
}

impl Next<f64> for WilderRsi {
    type Output = f64;

    fn next(&mut self, close: f64) -> f64 {
        let change = self.prev_close.map_or(0.0, |prev| close - prev);
        self.prev_close = Some(close);

        self.avg_gain += self.alpha * (change.max(0.0) - self.avg_gain);
        self.avg_loss += self.alpha * ((-change).max(0.0) - self.avg_loss);
        self.count += 1;

        if self.count < self.period {
            return f64::NAN;
        }
        if self.avg_loss == 0.0 {
            return 100.0;
        }
        100.0 - 100.0 / (1.0 + self.avg_gain / self.avg_loss)
    }
}

/// Wilder ATR.
#[derive(Debug, Clone)]
pub struct WilderAtr {
    period: usize,
    prev_close: Option<f64>,
    tr_sum: f64,
    atr: f64,
    count: usize,
}

impl WilderAtr {
    pub fn new(period: usize) -> Result<Self, FeatureError> {
        if period == 0 {
            return Err(FeatureError::Indicator("ATR period는 0보다 커야 합니다".to_string()));
        }
        Ok(Self {
            period,
            prev_close: None,
            tr_sum: 0.0,
            atr: f64::NAN,
            count: 0,
        })
    }

    fn true_range(&self, high: f64, low: f64) -> f64 {
        let range = high - low;
        match self.prev_close {
            Some(prev) => range.max((high - prev).abs()).max((low - prev).abs()),
            None => range,
        }
    }
}

impl<T: High + Low + Close> Next<&T> for WilderAtr {
    type Output = f64;

    fn next(&mut self, item: &T) -> f64 {
        let tr = self.true_range(item.high(), item.low());
        self.prev_close = Some(item.close());
        self.count += 1;

        let n = self.period as f64;
        if self.count < self.period {
            self.tr_sum += tr;
        } else if self.count == self.period {
            self.atr = (self.tr_sum + tr) / n;
        } else {
            self.atr = (self.atr * (n - 1.0) + tr) / n;
        }
        self.atr
    }
}

#[cfg(test)]
mod tests {
    use ta::DataItem;

    use super::*;

    fn item(high: f64, low: f64, close: f64) -> DataItem {
        DataItem::builder()
            .open(close)
            .high(high)
            .low(low)
            .close(close)
            .volume(1.0)
            .build()
            .unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn test_rsi_wilder_values() {
        let mut rsi = WilderRsi::new(3).unwrap();
        let out: Vec<f64> = [10.0, 11.0, 10.0, 12.0, 12.0, 11.0]
            .into_iter()
            .map(|c| rsi.next(c))
            .collect();

        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert_close(out[2], 40.0);
        assert_close(out[3], 100.0 - 300.0 / 14.0);
        assert_close(out[4], 100.0 - 300.0 / 14.0);
        assert_close(out[5], 100.0 - 10500.0 / 193.0);
    }

    #[test]
    fn test_rsi_without_losses_is_100() {
        let mut rsi = WilderRsi::new(14).unwrap();
        let last = (0..20).map(|i| rsi.next(100.0 + i as f64)).last().unwrap();
        assert_eq!(last, 100.0);
    }

    #[test]
    fn test_atr_wilder_values() {
        let mut atr = WilderAtr::new(3).unwrap();
        let out: Vec<f64> = [
            item(12.0, 9.0, 10.0),
            item(13.0, 10.0, 12.0),
            item(12.0, 11.0, 11.0),
            item(15.0, 11.0, 14.0),
            item(14.0, 12.0, 13.0),
        ]
        .iter()
        .map(|i| atr.next(i))
        .collect();

        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert_close(out[2], 7.0 / 3.0);
        assert_close(out[3], 26.0 / 9.0);
        assert_close(out[4], 70.0 / 27.0);
    }

    #[test]
    fn test_zero_period_rejected() {
        assert!(WilderRsi::new(0).is_err());
        assert!(WilderAtr::new(0).is_err());
    }
}
