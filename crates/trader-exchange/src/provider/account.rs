//! 계좌 provider trait과 일괄 청산 헬퍼.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use trader_core::{ExchangePosition, WalletBalance};

use crate::ExchangeError;

/// 계좌 조회 및 포지션 청산.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// 거래소 이름.
    fn exchange_name(&self) -> &str;

    /// 열린 포지션 조회 (정산 코인 기준).
    async fn fetch_positions(&self, settle_coin: &str)
        -> Result<Vec<ExchangePosition>, ExchangeError>;

    /// 지갑 잔고 조회.
    async fn fetch_wallet_balance(&self) -> Result<WalletBalance, ExchangeError>;

    /// 반대 방향 reduce-only 시장가 주문으로 포지션 청산. 주문 ID 반환.
    async fn close_position(&self, position: &ExchangePosition) -> Result<String, ExchangeError>;
}

/// 일괄 청산 결과.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseSummary {
    /// 청산 주문이 접수된 심볼
    pub closed: Vec<String>,
    /// 보호 목록에 걸려 건너뛴 심볼
    pub skipped: Vec<String>,
    /// 청산 실패한 심볼과 사유
    pub failed: Vec<(String, String)>,
}

impl CloseSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// 결과 요약 로그.
    pub fn log_summary(&self) {
        info!(
            closed = self.closed.len(),
            skipped = self.skipped.len(),
            failed = self.failed.len(),
            "포지션 일괄 청산 완료"
        );
    }
}

/// 보호 목록에 없는 모든 포지션을 청산합니다.
///
/// 심볼에 `do_not_trade`의 토큰이 포함되어 있으면 건너뜁니다 (예: "BTC" → "BTCUSDT" 보호).
/// 개별 청산 실패는 기록만 하고 계속 진행하며, 청산 사이에 `delay`만큼 대기합니다.
/// 포지션 목록 조회 실패만 에러로 반환합니다.
pub async fn close_all_positions<P>(
    provider: &P,
    settle_coin: &str,
    do_not_trade: &[String],
    delay: Duration,
) -> Result<CloseSummary, ExchangeError>
where
    P: AccountProvider + ?Sized,
{
    let positions = provider.fetch_positions(settle_coin).await?;
    let mut summary = CloseSummary::default();

    info!(
        exchange = provider.exchange_name(),
        count = positions.len(),
        "포지션 일괄 청산 시작"
    );

    for position in positions.iter().filter(|p| p.is_open()) {
        if do_not_trade
            .iter()
            .any(|token| !token.is_empty() && position.symbol.contains(token.as_str()))
        {
            info!(symbol = %position.symbol, "보호 목록 심볼, 청산 건너뜀");
            summary.skipped.push(position.symbol.clone());
            continue;
        }

        match provider.close_position(position).await {
            Ok(order_id) => {
                info!(
                    symbol = %position.symbol,
                    side = %position.side.opposite(),
                    size = %position.size,
                    order_id = %order_id,
                    "청산 주문 접수"
                );
                summary.closed.push(position.symbol.clone());
            }
            Err(e) => {
                error!(symbol = %position.symbol, error = %e, "청산 실패");
                summary.failed.push((position.symbol.clone(), e.to_string()));
            }
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    if !summary.is_clean() {
        warn!(failed = summary.failed.len(), "일부 포지션 청산 실패");
    }
    summary.log_summary();

    Ok(summary)
}
