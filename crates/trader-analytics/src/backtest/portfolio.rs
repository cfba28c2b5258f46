//! 시뮬레이션 포트폴리오 (현금 + 롱 포지션 목록).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 보유 중인 롱 포지션 (진입 1회 = 1개).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub entry_time_ms: i64,
    pub entry_price: Decimal,
    /// 정수 주 수
    pub size: Decimal,
    pub entry_commission: Decimal,
}

impl Position {
    /// 진입 총비용 (수수료 포함).
    pub fn cost(&self) -> Decimal {
        self.size * self.entry_price + self.entry_commission
    }

    pub fn market_value(&self, price: Decimal) -> Decimal {
        self.size * price
    }
}

/// 청산 완료된 거래.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub entry_time_ms: i64,
    pub exit_time_ms: i64,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub size: Decimal,
    /// 진입/청산 수수료를 모두 반영한 손익
    pub pnl: Decimal,
    /// 진입 비용 대비 수익률 (%)
    pub return_pct: Decimal,
    /// 진입 + 청산 수수료
    pub commission: Decimal,
}

impl ClosedTrade {
    pub fn is_win(&self) -> bool {
        self.pnl > Decimal::ZERO
    }

    pub fn is_loss(&self) -> bool {
        self.pnl < Decimal::ZERO
    }
}

/// 진입이 거부된 이유.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRejection {
    MaxOpenTrades,
    InsufficientCash,
    /// `floor(trade_value / price)`가 0
    ZeroSize,
}

/// 현금과 포지션 상태.
#[derive(Debug, Clone)]
pub struct Portfolio {
    cash: Decimal,
    positions: Vec<Position>,
    closed: Vec<ClosedTrade>,
    commission_fraction: Decimal,
    total_commission: Decimal,
}

impl Portfolio {
    pub fn new(initial_cash: Decimal, commission_fraction: Decimal) -> Self {
        Self {
            cash: initial_cash,
            positions: Vec::new(),
            closed: Vec::new(),
            commission_fraction,
            total_commission: Decimal::ZERO,
        }
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn open_trades(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.closed
    }

    pub fn total_commission(&self) -> Decimal {
        self.total_commission
    }

    /// 현금 + 보유 포지션 평가액.
    pub fn equity(&self, price: Decimal) -> Decimal {
        self.cash
            + self
                .positions
                .iter()
                .map(|p| p.market_value(price))
                .sum::<Decimal>()
    }

    /// 롱 진입 시도.
    ///
    /// `open_trades < max_open_trades`이고 `cash >= trade_value`일 때만 진입하며,
    /// 수수료 포함 비용이 현금을 넘으면 거부합니다.
    pub fn try_enter_long(
        &mut self,
        time_ms: i64,
        price: Decimal,
        trade_value: Decimal,
        max_open_trades: usize,
    ) -> Result<&Position, EntryRejection> {
        if self.positions.len() >= max_open_trades {
            return Err(EntryRejection::MaxOpenTrades);
        }
        if self.cash < trade_value {
            return Err(EntryRejection::InsufficientCash);
        }

        let size = trade_value
            .checked_div(price)
            .map(|shares| shares.floor())
            .unwrap_or(Decimal::ZERO);
        if size <= Decimal::ZERO || price <= Decimal::ZERO {
            return Err(EntryRejection::ZeroSize);
        }

        let notional = size * price;
        let commission = notional * self.commission_fraction;
        if notional + commission > self.cash {
            return Err(EntryRejection::InsufficientCash);
        }

        self.cash -= notional + commission;
        self.total_commission += commission;
        self.positions.push(Position {
            entry_time_ms: time_ms,
            entry_price: price,
            size,
            entry_commission: commission,
        });

        Ok(&self.positions[self.positions.len() - 1])
    }

    /// 모든 롱 포지션 청산. 청산한 거래 수를 반환합니다.
    pub fn close_all(&mut self, time_ms: i64, price: Decimal) -> usize {
        let count = self.positions.len();

        for position in std::mem::take(&mut self.positions) {
            let notional = position.size * price;
            let commission = notional * self.commission_fraction;
            let proceeds = notional - commission;

            self.cash += proceeds;
            self.total_commission += commission;

            let cost = position.cost();
            let pnl = proceeds - cost;
            let return_pct = if cost.is_zero() {
                Decimal::ZERO
            } else {
                pnl / cost * Decimal::ONE_HUNDRED
            };

            self.closed.push(ClosedTrade {
                entry_time_ms: position.entry_time_ms,
                exit_time_ms: time_ms,
                entry_price: position.entry_price,
                exit_price: price,
                size: position.size,
                pnl,
                return_pct,
                commission: position.entry_commission + commission,
            });
        }

        count
    }

    /// 결과 추출 (미청산 포지션, 청산 거래).
    pub fn into_parts(self) -> (Vec<Position>, Vec<ClosedTrade>) {
        (self.positions, self.closed)
    }
}
