//! 기술적 지표 피처 계산.
//!
//! 캔들 시리즈에서 분류 모델 입력으로 쓰는 10개 피처를 계산합니다.
//! 지표는 `ta` 크레이트의 스트리밍 구현(`Next`)을 사용하며,
//! RSI/ATR은 Wilder 평활 구현([`crate::indicators`])을 씁니다.
//! 각 지표의 워밍업 구간은 `None`(미정의)으로 표시합니다.
//!
//! | 피처 | 정의 | 미정의 구간 |
//! |------|------|-------------|
//! | `Return_1bar` | close / prev close - 1 | 1 |
//! | `EMA_12` | EMA(12) | 11 |
//! | `EMA_26` | EMA(26) | 25 |
//! | `MACD_Hist` | MACD(12, 26, 9) 히스토그램 | 33 |
//! | `RSI_14` | Wilder RSI(14) | 13 |
//! | `Stoch_K_14` | Fast %K(14) | 13 |
//! | `BB_Width_20_2` | 볼린저(20, 2) 상단 - 하단 | 19 |
//! | `ATR_14` | Wilder ATR(14) | 13 |
//! | `OBV_Change` | OBV 차분 | 1 |
//! | `Volume_Change` | 거래량 차분 | 1 |

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use ta::indicators::{
    BollingerBands, ExponentialMovingAverage, FastStochastic, MovingAverageConvergenceDivergence,
    OnBalanceVolume,
};
use ta::{DataItem, Next};
use thiserror::Error;

use trader_core::Candle;

use crate::indicators::{WilderAtr, WilderRsi};

/// 피처 개수.
pub const FEATURE_COUNT: usize = 10;

/// 피처 이름 (모델/스케일러 아티팩트와 같은 순서).
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Return_1bar",
    "EMA_12",
    "EMA_26",
    "MACD_Hist",
    "RSI_14",
    "Stoch_K_14",
    "BB_Width_20_2",
    "ATR_14",
    "OBV_Change",
    "Volume_Change",
];

/// 피처별 미정의(워밍업) 바 개수.
pub const FEATURE_WARMUP: [usize; FEATURE_COUNT] = [1, 11, 25, 33, 13, 13, 19, 13, 1, 1];

/// 모든 피처가 정의된 벡터.
pub type FeatureVector = [f64; FEATURE_COUNT];

/// 피처 계산 에러.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// 지표 생성 실패
    #[error("지표 초기화 실패: {0}")]
    Indicator(String),

    /// f64로 변환할 수 없는 캔들
    #[error("캔들 변환 실패 (timestamp_ms={0})")]
    InvalidCandle(i64),
}

// =============================================================================
// Bar
// =============================================================================

/// 캔들 + 피처.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub candle: Candle,
    /// [`FEATURE_NAMES`] 순서. `None`은 워밍업/미정의.
    pub features: [Option<f64>; FEATURE_COUNT],
}

impl Bar {
    pub fn new(candle: Candle, features: [Option<f64>; FEATURE_COUNT]) -> Self {
        Self { candle, features }
    }

    /// 모든 피처가 정의되어 있으면 벡터 반환.
    pub fn feature_vector(&self) -> Option<FeatureVector> {
        let mut out = [0.0; FEATURE_COUNT];
        for (slot, value) in out.iter_mut().zip(self.features.iter()) {
            *slot = (*value)?;
        }
        Some(out)
    }

    pub fn is_complete(&self) -> bool {
        self.features.iter().all(Option::is_some)
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.candle.timestamp_ms
    }
}

// =============================================================================
// 계산
// =============================================================================

/// 모든 캔들에 피처를 붙입니다 (워밍업 구간 포함, 값은 `None`).
pub fn annotate_features(candles: &[Candle]) -> Result<Vec<Bar>, FeatureError> {
    let mut ema12 = ExponentialMovingAverage::new(12).map_err(indicator_err)?;
    let mut ema26 = ExponentialMovingAverage::new(26).map_err(indicator_err)?;
    let mut macd = MovingAverageConvergenceDivergence::new(12, 26, 9).map_err(indicator_err)?;
    let mut rsi = WilderRsi::new(14)?;
    let mut stoch = FastStochastic::new(14).map_err(indicator_err)?;
    let mut bb = BollingerBands::new(20, 2.0).map_err(indicator_err)?;
    let mut atr = WilderAtr::new(14)?;
    let mut obv = OnBalanceVolume::new();

    let mut prev: Option<(f64, f64, f64)> = None; // (close, obv, volume)
    let mut bars = Vec::with_capacity(candles.len());

    for (i, candle) in candles.iter().enumerate() {
        let (item, close, volume) = to_data_item(candle)?;

        let ema12_v = ema12.next(close);
        let ema26_v = ema26.next(close);
        let macd_hist = macd.next(close).histogram;
        let rsi_v = rsi.next(close);
        let stoch_k = stoch.next(&item);
        let bands = bb.next(close);
        let atr_v = atr.next(&item);
        let obv_v = obv.next(&item);

        let raw = [
            prev.and_then(|(c, _, _)| (c != 0.0).then(|| close / c - 1.0)),
            Some(ema12_v),
            Some(ema26_v),
            Some(macd_hist),
            Some(rsi_v),
            Some(stoch_k),
            Some(bands.upper - bands.lower),
            Some(atr_v),
            prev.map(|(_, o, _)| obv_v - o),
            prev.map(|(_, _, v)| volume - v),
        ];

        let mut features = [None; FEATURE_COUNT];
        for (k, value) in raw.into_iter().enumerate() {
            if i >= FEATURE_WARMUP[k] {
                features[k] = value.filter(|v| v.is_finite());
            }
        }

        bars.push(Bar::new(candle.clone(), features));
        prev = Some((close, obv_v, volume));
    }

    Ok(bars)
}

/// 모든 피처가 정의된 바만 반환합니다.
pub fn compute_features(candles: &[Candle]) -> Result<Vec<Bar>, FeatureError> {
    Ok(annotate_features(candles)?
        .into_iter()
        .filter(Bar::is_complete)
        .collect())
}

/// 다음 방향 레이블.
///
/// `n_future` 바 뒤 종가가 현재 종가보다 높으면 1, 아니면 0.
/// 미래가 없는 마지막 `n_future`개는 `None`.
pub fn label_next_bar_direction(bars: &[Bar], n_future: usize) -> Vec<Option<u8>> {
    (0..bars.len())
        .map(|i| {
            bars.get(i + n_future)
                .filter(|_| n_future > 0)
                .map(|future| u8::from(future.candle.close > bars[i].candle.close))
        })
        .collect()
}

fn to_data_item(candle: &Candle) -> Result<(DataItem, f64, f64), FeatureError> {
    let invalid = || FeatureError::InvalidCandle(candle.timestamp_ms);

    let open = candle.open.to_f64().ok_or_else(invalid)?;
    let high = candle.high.to_f64().ok_or_else(invalid)?;
    let low = candle.low.to_f64().ok_or_else(invalid)?;
    let close = candle.close.to_f64().ok_or_else(invalid)?;
    let volume = candle.volume.to_f64().ok_or_else(invalid)?;

    let item = DataItem::builder()
        .open(open)
        .high(high)
        .low(low)
        .close(close)
        .volume(volume)
        .build()
        .map_err(|_| invalid())?;

    Ok((item, close, volume))
}

fn indicator_err<E: std::fmt::Debug>(e: E) -> FeatureError {
    FeatureError::Indicator(format!("{:?}", e))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;

    /// 완만하게 진동하는 테스트 캔들.
    fn wave_candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.4).sin() * 5.0 + i as f64 * 0.1;
                let close = Decimal::from_f64_retain(base).unwrap().round_dp(4);
                Candle::new(
                    i as i64 * 3_600_000,
                    close - dec!(0.3),
                    close + dec!(1),
                    close - dec!(1),
                    close,
                    Decimal::from(100 + (i % 7) as i64 * 10),
                )
            })
            .collect()
    }

    #[test]
    fn test_warmup_pattern() {
        let bars = annotate_features(&wave_candles(60)).unwrap();
        assert_eq!(bars.len(), 60);

        // 첫 바는 모든 피처 미정의
        assert!(bars[0].features.iter().all(Option::is_none));

        for (k, warmup) in FEATURE_WARMUP.iter().enumerate() {
            assert!(bars[warmup - 1].features[k].is_none(), "{}", FEATURE_NAMES[k]);
            assert!(bars[*warmup].features[k].is_some(), "{}", FEATURE_NAMES[k]);
        }

        assert!(!bars[32].is_complete());
        assert!(bars[33].is_complete());
    }

    #[test]
    fn test_compute_features_drops_warmup() {
        let bars = compute_features(&wave_candles(60)).unwrap();
        assert_eq!(bars.len(), 60 - 33);
        assert_eq!(bars[0].timestamp_ms(), 33 * 3_600_000);
        assert!(bars.iter().all(|b| b.feature_vector().is_some()));
    }

    #[test]
    fn test_feature_ranges() {
        for bar in compute_features(&wave_candles(80)).unwrap() {
            let f = bar.feature_vector().unwrap();
            assert!((0.0..=100.0).contains(&f[4]), "RSI {}", f[4]);
            assert!((0.0..=100.0).contains(&f[5]), "Stoch {}", f[5]);
            assert!(f[6] >= 0.0, "BB width {}", f[6]);
            assert!(f[7] > 0.0, "ATR {}", f[7]);
        }
    }

    #[test]
    fn test_return_and_volume_change() {
        let candles = vec![
            Candle::new(0, dec!(100), dec!(100), dec!(100), dec!(100), dec!(10)),
            Candle::new(1, dec!(110), dec!(110), dec!(110), dec!(110), dec!(25)),
        ];
        let bars = annotate_features(&candles).unwrap();

        let ret = bars[1].features[0].unwrap();
        assert!((ret - 0.1).abs() < 1e-12);
        assert_eq!(bars[1].features[9], Some(15.0));
        // 종가 상승 → OBV += volume
        assert_eq!(bars[1].features[8], Some(25.0));
    }

    #[test]
    fn test_rsi_and_atr_use_wilder_smoothing() {
        let candles = wave_candles(60);
        let bars = annotate_features(&candles).unwrap();

        let mut rsi = WilderRsi::new(14).unwrap();
        let mut atr = WilderAtr::new(14).unwrap();
        for (bar, candle) in bars.iter().zip(&candles) {
            let (item, close, _) = to_data_item(candle).unwrap();
            let expected_rsi = rsi.next(close);
            let expected_atr = atr.next(&item);
            if let Some(v) = bar.features[4] {
                assert_eq!(v, expected_rsi);
            }
            if let Some(v) = bar.features[7] {
                assert_eq!(v, expected_atr);
            }
        }

        // 상승만 있는 구간의 Wilder RSI는 정확히 100
        let rising: Vec<Candle> = (0..20)
            .map(|i| {
                let c = Decimal::from(100 + i);
                Candle::new(i as i64, c, c + dec!(1), c - dec!(1), c, dec!(1))
            })
            .collect();
        let bars = annotate_features(&rising).unwrap();
        assert_eq!(bars[13].features[4], Some(100.0));
        // 모든 True Range가 2인 구간의 ATR은 2
        assert_eq!(bars[19].features[7], Some(2.0));
    }

    #[test]
    fn test_empty_input() {
        assert!(annotate_features(&[]).unwrap().is_empty());
        assert!(compute_features(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_labels() {
        let closes = [dec!(10), dec!(11), dec!(11), dec!(9)];
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, c)| Bar::new(Candle::new(i as i64, *c, *c, *c, *c, dec!(1)), [None; FEATURE_COUNT]))
            .collect();

        assert_eq!(
            label_next_bar_direction(&bars, 1),
            vec![Some(1), Some(0), Some(0), None]
        );
        assert_eq!(
            label_next_bar_direction(&bars, 2),
            vec![Some(1), Some(0), None, None]
        );
        assert!(label_next_bar_direction(&bars, 0).iter().all(Option::is_none));
    }
}
