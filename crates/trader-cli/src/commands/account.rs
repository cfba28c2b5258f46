//! Bybit 계좌 명령어 (포지션 조회, 일괄 청산, 잔고 조회).
//!
//! 서명 요청이므로 `BYBIT_API_KEY`, `BYBIT_API_SECRET` 환경변수가 필요합니다.
//!
//! ```bash
//! trader positions
//! trader close-positions --keep BTC,ETH --delay-ms 500
//! trader balances
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use trader_collector::CollectorConfig;
use trader_core::{ExchangePosition, WalletBalance};
use trader_exchange::{
    close_all_positions, AccountProvider, BybitClient, BybitCredentials, BybitExchangeProvider,
    CloseSummary,
};

/// 환경변수 설정과 API 키로 서명 가능한 provider 생성.
fn signed_provider() -> Result<BybitExchangeProvider> {
    let config = CollectorConfig::from_env()?;
    let credentials = BybitCredentials::from_env()?;
    let client = BybitClient::new(config.bybit_base_url)?.with_credentials(credentials);
    Ok(BybitExchangeProvider::new(Arc::new(client)))
}

/// 열린 포지션 조회 후 출력.
pub async fn run_positions(settle_coin: &str) -> Result<Vec<ExchangePosition>> {
    let provider = signed_provider()?;
    let positions = provider.fetch_positions(settle_coin).await?;
    info!(count = positions.len(), settle_coin, "포지션 조회 완료");

    println!("\n열린 포지션: {}", positions.len());
    for p in &positions {
        println!(
            "  {:<14} {:<4} size={} avg={} mark={} uPnL={}",
            p.symbol, p.side, p.size, p.avg_price, p.mark_price, p.unrealised_pnl
        );
    }
    Ok(positions)
}

/// 보호 목록을 제외한 모든 포지션 청산.
pub async fn run_close_positions(
    settle_coin: &str,
    keep: &[String],
    delay: Duration,
) -> Result<CloseSummary> {
    let provider = signed_provider()?;
    let summary = close_all_positions(&provider, settle_coin, keep, delay).await?;

    println!(
        "\n청산: {} / 건너뜀: {} / 실패: {}",
        summary.closed.len(),
        summary.skipped.len(),
        summary.failed.len()
    );
    for (symbol, reason) in &summary.failed {
        println!("  실패 {}: {}", symbol, reason);
    }
    Ok(summary)
}

/// 지갑 잔고 조회 후 출력.
pub async fn run_balances() -> Result<WalletBalance> {
    let provider = signed_provider()?;
    let balance = provider.fetch_wallet_balance().await?;

    println!("\n{} {} 계좌", balance.exchange, balance.account_type);
    for h in balance.non_zero() {
        println!(
            "  {:<8} equity={} wallet={} usd={}",
            h.coin, h.equity, h.wallet_balance, h.usd_value
        );
    }
    println!("총 평가액 (USD): {}", balance.total_usd());
    Ok(balance)
}
