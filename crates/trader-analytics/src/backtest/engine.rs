//! 백테스팅 엔진
//!
//! 피처가 붙은 바 시리즈를 시간순으로 한 번 순회하며 결정 함수를 적용합니다.
//!
//! # 바 처리 순서
//!
//! 1. 피처 중 하나라도 미정의 → 결정 없이 건너뜀 (`skipped_bars` 집계)
//! 2. 현재 바 피처로 결정
//! 3. `EnterLong` → 한도/현금이 허용하면 `floor(trade_value / price)`주 매수
//! 4. `ExitLong` → 보유 롱 전량 청산
//! 5. 자산 = 현금 + Σ 주 수 × 종가 기록
//!
//! 시뮬레이션 가격은 `close × units_per_share`입니다.
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! use trader_analytics::backtest::{BacktestConfig, BacktestEngine};
//! use rust_decimal_macros::dec;
//!
//! let config = BacktestConfig::new(dec!(10_000))
//!     .with_trade_value(dec!(250))
//!     .with_commission_fraction(dec!(0.001));
//!
//! let report = BacktestEngine::new(config).run(&bars, &mut decision)?;
//! println!("{}", report.summary());
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use trader_core::time::format_millis;

use super::decision::{Decision, DecisionCounts, DecisionFunction};
use super::portfolio::{ClosedTrade, Portfolio, Position};
use crate::features::Bar;
use crate::performance::{BacktestMetrics, EquityPoint};

/// 백테스트 오류
#[derive(Debug, Error)]
pub enum BacktestError {
    /// 설정 오류
    #[error("백테스트 설정 오류: {0}")]
    ConfigError(String),

    /// 데이터 오류
    #[error("데이터 오류: {0}")]
    DataError(String),
}

/// 백테스트 결과 타입
pub type BacktestResult<T> = Result<T, BacktestError>;

// =============================================================================
// 설정
// =============================================================================

/// 백테스트 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// 초기 현금
    #[serde(default = "default_initial_cash")]
    pub initial_cash: Decimal,

    /// 진입 1회당 목표 금액
    #[serde(default = "default_trade_value")]
    pub trade_value: Decimal,

    /// 동시에 보유할 수 있는 최대 거래 수
    #[serde(default = "default_max_open_trades")]
    pub max_open_trades: usize,

    /// 체결 금액 대비 수수료 비율 (0.001 = 0.1%)
    #[serde(default = "default_commission_fraction")]
    pub commission_fraction: Decimal,

    /// 1주에 해당하는 기초자산 수량 (가격 스케일)
    #[serde(default = "default_units_per_share")]
    pub units_per_share: Decimal,

    /// 마지막 바에서 미청산 포지션 강제 청산
    #[serde(default)]
    pub close_open_at_end: bool,
}

fn default_initial_cash() -> Decimal {
    dec!(10000)
}

fn default_trade_value() -> Decimal {
    dec!(250)
}

fn default_max_open_trades() -> usize {
    25
}

fn default_commission_fraction() -> Decimal {
    dec!(0.001)
}

fn default_units_per_share() -> Decimal {
    Decimal::ONE
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_cash: default_initial_cash(),
            trade_value: default_trade_value(),
            max_open_trades: default_max_open_trades(),
            commission_fraction: default_commission_fraction(),
            units_per_share: default_units_per_share(),
            close_open_at_end: false,
        }
    }
}

impl BacktestConfig {
    /// 새로운 백테스트 설정을 생성합니다.
    pub fn new(initial_cash: Decimal) -> Self {
        Self {
            initial_cash,
            ..Default::default()
        }
    }

    /// 진입 금액 설정
    pub fn with_trade_value(mut self, value: Decimal) -> Self {
        self.trade_value = value;
        self
    }

    /// 최대 동시 거래 수 설정
    pub fn with_max_open_trades(mut self, max: usize) -> Self {
        self.max_open_trades = max;
        self
    }

    /// 수수료 비율 설정
    pub fn with_commission_fraction(mut self, fraction: Decimal) -> Self {
        self.commission_fraction = fraction;
        self
    }

    /// 가격 스케일 설정
    pub fn with_units_per_share(mut self, units: Decimal) -> Self {
        self.units_per_share = units;
        self
    }

    /// 종료 시 강제 청산 설정
    pub fn with_close_open_at_end(mut self, close: bool) -> Self {
        self.close_open_at_end = close;
        self
    }

    /// 설정 검증
    pub fn validate(&self) -> BacktestResult<()> {
        if self.initial_cash <= Decimal::ZERO {
            return Err(BacktestError::ConfigError(
                "초기 현금은 0보다 커야 합니다".to_string(),
            ));
        }
        if self.trade_value <= Decimal::ZERO {
            return Err(BacktestError::ConfigError(
                "진입 금액은 0보다 커야 합니다".to_string(),
            ));
        }
        if self.max_open_trades == 0 {
            return Err(BacktestError::ConfigError(
                "최대 동시 거래 수는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.commission_fraction < Decimal::ZERO || self.commission_fraction >= Decimal::ONE {
            return Err(BacktestError::ConfigError(
                "수수료 비율은 0 이상 1 미만이어야 합니다".to_string(),
            ));
        }
        if self.units_per_share <= Decimal::ZERO {
            return Err(BacktestError::ConfigError(
                "units_per_share는 0보다 커야 합니다".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// 리포트
// =============================================================================

/// 백테스트 실행 리포트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// 설정 정보
    pub config: BacktestConfig,

    /// 성과 지표
    pub metrics: BacktestMetrics,

    /// 청산 완료 거래
    pub trades: Vec<ClosedTrade>,

    /// 종료 시점 미청산 포지션
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub open_positions: Vec<Position>,

    /// 자산 곡선 (바마다 1개)
    pub equity_curve: Vec<EquityPoint>,

    /// 결정 횟수
    pub decisions: DecisionCounts,

    /// 피처 미정의로 건너뛴 바 수
    pub skipped_bars: usize,

    /// 백테스트 기간 시작 (epoch ms)
    pub start_time_ms: i64,

    /// 백테스트 기간 종료 (epoch ms)
    pub end_time_ms: i64,

    /// 데이터 포인트 수
    pub data_points: usize,
}

impl BacktestReport {
    /// 요약 문자열 반환
    pub fn summary(&self) -> String {
        let profit_factor = self
            .metrics
            .profit_factor
            .map(|pf| format!("{:.2}", pf))
            .unwrap_or_else(|| "n/a".to_string());

        format!(
            "백테스트 결과 요약\n\
             ═══════════════════════════════════════\n\
             기간: {} → {}\n\
             데이터 포인트: {} (건너뜀: {})\n\
             ───────────────────────────────────────\n\
             초기 현금: {}\n\
             최종 자산: {:.2}\n\
             총 수익률: {:.2}%\n\
             Buy & Hold 수익률: {:.2}%\n\
             초과 수익률: {:.2}%\n\
             ───────────────────────────────────────\n\
             총 거래: {} (미청산: {})\n\
             승률: {:.1}%\n\
             프로핏 팩터: {}\n\
             ───────────────────────────────────────\n\
             샤프 비율: {:.2}\n\
             최대 낙폭: {:.2}%\n\
             총 수수료: {:.2}\n\
             ═══════════════════════════════════════",
            format_millis(self.start_time_ms),
            format_millis(self.end_time_ms),
            self.data_points,
            self.skipped_bars,
            self.config.initial_cash,
            self.metrics.final_equity,
            self.metrics.total_return_pct,
            self.metrics.buy_hold_return_pct,
            self.metrics.excess_return_pct,
            self.metrics.trade_count,
            self.metrics.open_trades,
            self.metrics.win_rate_pct,
            profit_factor,
            self.metrics.sharpe_ratio,
            self.metrics.max_drawdown_pct,
            self.metrics.total_commission,
        )
    }
}

// =============================================================================
// 엔진
// =============================================================================

/// 백테스팅 엔진
///
/// 실행마다 새 포트폴리오를 만들므로 같은 엔진으로 여러 번 실행할 수 있습니다.
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// 백테스트 실행
    pub fn run<D>(&self, bars: &[Bar], decider: &mut D) -> BacktestResult<BacktestReport>
    where
        D: DecisionFunction + ?Sized,
    {
        self.config.validate()?;
        validate_series(bars)?;

        let config = &self.config;
        let first_close = bars[0].candle.close;
        let last_index = bars.len() - 1;

        let mut portfolio = Portfolio::new(config.initial_cash, config.commission_fraction);
        let mut equity_curve = Vec::with_capacity(bars.len());
        let mut decisions = DecisionCounts::default();
        let mut skipped_bars = 0usize;

        info!(
            bars = bars.len(),
            start = %format_millis(bars[0].timestamp_ms()),
            end = %format_millis(bars[last_index].timestamp_ms()),
            initial_cash = %config.initial_cash,
            "백테스트 시작"
        );

        for (i, bar) in bars.iter().enumerate() {
            let ts = bar.timestamp_ms();
            let price = bar.candle.close * config.units_per_share;

            match bar.feature_vector() {
                None => skipped_bars += 1,
                Some(features) => {
                    let decision = decider.decide(&features);
                    decisions.record(decision);

                    match decision {
                        Decision::EnterLong => {
                            match portfolio.try_enter_long(
                                ts,
                                price,
                                config.trade_value,
                                config.max_open_trades,
                            ) {
                                Ok(position) => debug!(
                                    time = %format_millis(ts),
                                    price = %price,
                                    size = %position.size,
                                    "롱 진입"
                                ),
                                Err(reason) => debug!(
                                    time = %format_millis(ts),
                                    reason = ?reason,
                                    "진입 건너뜀"
                                ),
                            }
                        }
                        Decision::ExitLong => {
                            let closed = portfolio.close_all(ts, price);
                            if closed > 0 {
                                debug!(time = %format_millis(ts), price = %price, closed, "롱 전량 청산");
                            }
                        }
                        Decision::Hold => {}
                    }
                }
            }

            if i == last_index && config.close_open_at_end && portfolio.open_trades() > 0 {
                let closed = portfolio.close_all(ts, price);
                info!(closed, "종료 시점 강제 청산");
            }

            equity_curve.push(EquityPoint {
                timestamp_ms: ts,
                equity: portfolio.equity(price),
                buy_hold_equity: config.initial_cash * bar.candle.close / first_close,
            });
        }

        let total_commission = portfolio.total_commission();
        let (open_positions, trades) = portfolio.into_parts();
        let metrics = BacktestMetrics::calculate(
            config.initial_cash,
            &equity_curve,
            &trades,
            open_positions.len(),
            total_commission,
        );

        info!(
            final_equity = %metrics.final_equity,
            trades = metrics.trade_count,
            open_trades = metrics.open_trades,
            skipped_bars,
            "백테스트 완료"
        );

        Ok(BacktestReport {
            config: config.clone(),
            metrics,
            trades,
            open_positions,
            equity_curve,
            decisions,
            skipped_bars,
            start_time_ms: bars[0].timestamp_ms(),
            end_time_ms: bars[last_index].timestamp_ms(),
            data_points: bars.len(),
        })
    }
}

fn validate_series(bars: &[Bar]) -> BacktestResult<()> {
    if bars.is_empty() {
        return Err(BacktestError::DataError("바 시리즈가 비어 있습니다".to_string()));
    }
    if let Some(w) = bars
        .windows(2)
        .find(|w| w[0].timestamp_ms() >= w[1].timestamp_ms())
    {
        return Err(BacktestError::DataError(format!(
            "타임스탬프가 시간순이 아닙니다: {} → {}",
            format_millis(w[0].timestamp_ms()),
            format_millis(w[1].timestamp_ms())
        )));
    }
    if bars[0].candle.close <= Decimal::ZERO {
        return Err(BacktestError::DataError(
            "첫 바의 종가가 0 이하입니다".to_string(),
        ));
    }
    Ok(())
}
