//! 백테스트 성과 지표.
//!
//! 자산 곡선과 청산 거래 목록에서 요약 지표를 계산합니다.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::backtest::ClosedTrade;

const MILLIS_PER_YEAR: f64 = 365.25 * 86_400_000.0;

/// 자산 곡선의 한 점.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp_ms: i64,
    /// 전략 자산 (현금 + 평가액)
    pub equity: Decimal,
    /// 같은 초기 자본으로 첫 바에 전량 매수했을 때의 자산
    pub buy_hold_equity: Decimal,
}

/// 성과 요약.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub final_equity: Decimal,
    pub total_return_pct: Decimal,
    pub buy_hold_return_pct: Decimal,
    /// 전략 수익률 - Buy & Hold 수익률
    pub excess_return_pct: Decimal,
    pub max_drawdown_pct: Decimal,
    pub win_rate_pct: Decimal,
    /// 손실 거래가 없으면 `None`
    pub profit_factor: Option<Decimal>,
    pub trade_count: usize,
    pub open_trades: usize,
    pub total_commission: Decimal,
    /// 바 간격으로 연율화한 샤프 비율 (무위험 수익률 0)
    pub sharpe_ratio: f64,
}

impl BacktestMetrics {
    /// 지표 계산.
    ///
    /// `equity_curve`는 시간순이며 비어 있지 않아야 의미 있는 값이 나옵니다.
    pub fn calculate(
        initial_cash: Decimal,
        equity_curve: &[EquityPoint],
        trades: &[ClosedTrade],
        open_trades: usize,
        total_commission: Decimal,
    ) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_cash);
        let final_buy_hold = equity_curve
            .last()
            .map(|p| p.buy_hold_equity)
            .unwrap_or(initial_cash);

        let total_return_pct = pct_change(initial_cash, final_equity);
        let buy_hold_return_pct = pct_change(initial_cash, final_buy_hold);

        let wins = trades.iter().filter(|t| t.is_win()).count();
        let win_rate_pct = if trades.is_empty() {
            Decimal::ZERO
        } else {
            Decimal::from(wins) / Decimal::from(trades.len()) * Decimal::ONE_HUNDRED
        };

        Self {
            final_equity,
            total_return_pct,
            buy_hold_return_pct,
            excess_return_pct: total_return_pct - buy_hold_return_pct,
            max_drawdown_pct: max_drawdown_pct(initial_cash, equity_curve),
            win_rate_pct,
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
            open_trades,
            total_commission,
            sharpe_ratio: sharpe_ratio(equity_curve),
        }
    }
}

fn pct_change(from: Decimal, to: Decimal) -> Decimal {
    if from.is_zero() {
        return Decimal::ZERO;
    }
    (to - from) / from * Decimal::ONE_HUNDRED
}

/// 최대 낙폭 (%). 고점 대비 하락률의 최댓값.
///
/// 고점은 초기 자본에서 시작하므로 첫 바의 손실도 낙폭에 포함됩니다.
pub fn max_drawdown_pct(initial_cash: Decimal, curve: &[EquityPoint]) -> Decimal {
    let mut peak = initial_cash;
    let mut max_dd = Decimal::ZERO;

    for point in curve {
        if point.equity > peak {
            peak = point.equity;
        }
        if peak > Decimal::ZERO {
            let dd = (peak - point.equity) / peak * Decimal::ONE_HUNDRED;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

/// 총이익 / 총손실. 손실 거래가 없으면 `None`.
pub fn profit_factor(trades: &[ClosedTrade]) -> Option<Decimal> {
    let gross_loss: Decimal = trades
        .iter()
        .filter(|t| t.is_loss())
        .map(|t| -t.pnl)
        .sum();
    if gross_loss.is_zero() {
        return None;
    }

    let gross_profit: Decimal = trades.iter().filter(|t| t.is_win()).map(|t| t.pnl).sum();
    Some(gross_profit / gross_loss)
}

/// 바 단위 수익률의 샤프 비율, 평균 바 간격으로 연율화.
///
/// 점이 3개 미만이거나 표준편차가 0이면 0.
pub fn sharpe_ratio(curve: &[EquityPoint]) -> f64 {
    if curve.len() < 3 {
        return 0.0;
    }

    let returns: Vec<f64> = curve
        .windows(2)
        .filter_map(|w| {
            let prev = w[0].equity.to_f64()?;
            let next = w[1].equity.to_f64()?;
            (prev != 0.0).then(|| next / prev - 1.0)
        })
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = variance.sqrt();
    if std == 0.0 || !std.is_finite() {
        return 0.0;
    }

    let span_ms = (curve[curve.len() - 1].timestamp_ms - curve[0].timestamp_ms) as f64;
    let avg_spacing_ms = span_ms / (curve.len() - 1) as f64;
    if avg_spacing_ms <= 0.0 {
        return 0.0;
    }

    let bars_per_year = MILLIS_PER_YEAR / avg_spacing_ms;
    mean / std * bars_per_year.sqrt()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn point(ts: i64, equity: Decimal) -> EquityPoint {
        EquityPoint {
            timestamp_ms: ts,
            equity,
            buy_hold_equity: equity,
        }
    }

    fn trade(pnl: Decimal) -> ClosedTrade {
        ClosedTrade {
            entry_time_ms: 0,
            exit_time_ms: 1,
            entry_price: dec!(1),
            exit_price: dec!(1),
            size: dec!(1),
            pnl,
            return_pct: Decimal::ZERO,
            commission: Decimal::ZERO,
        }
    }

    #[test]
    fn test_max_drawdown() {
        let curve = vec![
            point(0, dec!(100)),
            point(1, dec!(120)),
            point(2, dec!(90)),
            point(3, dec!(130)),
            point(4, dec!(117)),
        ];
        assert_eq!(max_drawdown_pct(dec!(100), &curve), dec!(25));
        assert_eq!(max_drawdown_pct(dec!(100), &[]), Decimal::ZERO);
    }

    #[test]
    fn test_max_drawdown_counts_first_bar_loss() {
        // 첫 바부터 초기 자본 아래
        let curve = vec![point(0, dec!(990)), point(1, dec!(995))];
        assert_eq!(max_drawdown_pct(dec!(1000), &curve), dec!(1));

        let m = BacktestMetrics::calculate(dec!(1000), &curve, &[], 0, Decimal::ZERO);
        assert_eq!(m.max_drawdown_pct, dec!(1));
    }

    #[test]
    fn test_profit_factor() {
        assert_eq!(profit_factor(&[trade(dec!(10))]), None);
        assert_eq!(
            profit_factor(&[trade(dec!(30)), trade(dec!(-10)), trade(dec!(-5))]),
            Some(dec!(2))
        );
    }

    #[test]
    fn test_sharpe() {
        let flat = vec![point(0, dec!(100)), point(1, dec!(100)), point(2, dec!(100))];
        assert_eq!(sharpe_ratio(&flat), 0.0);
        assert_eq!(sharpe_ratio(&flat[..2]), 0.0);

        let hour = 3_600_000;
        let rising = vec![
            point(0, dec!(100)),
            point(hour, dec!(101)),
            point(2 * hour, dec!(103)),
            point(3 * hour, dec!(104)),
        ];
        assert!(sharpe_ratio(&rising) > 0.0);
    }

    #[test]
    fn test_calculate() {
        let curve = vec![
            EquityPoint {
                timestamp_ms: 0,
                equity: dec!(1000),
                buy_hold_equity: dec!(1000),
            },
            EquityPoint {
                timestamp_ms: 1,
                equity: dec!(1100),
                buy_hold_equity: dec!(1050),
            },
        ];
        let trades = vec![trade(dec!(60)), trade(dec!(-20))];

        let m = BacktestMetrics::calculate(dec!(1000), &curve, &trades, 1, dec!(3));
        assert_eq!(m.final_equity, dec!(1100));
        assert_eq!(m.total_return_pct, dec!(10));
        assert_eq!(m.buy_hold_return_pct, dec!(5));
        assert_eq!(m.excess_return_pct, dec!(5));
        assert_eq!(m.win_rate_pct, dec!(50));
        assert_eq!(m.profit_factor, Some(dec!(3)));
        assert_eq!(m.trade_count, 2);
        assert_eq!(m.open_trades, 1);
    }
}
