//! Standalone kline collector CLI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trader_collector::modules::{self, FetchRequest};
use trader_collector::{CollectorConfig, CollectorError};
use trader_core::Candle;
use trader_exchange::{BybitClient, BybitExchangeProvider};

#[derive(Parser)]
#[command(name = "trader-collector")]
#[command(about = "Bybit historical kline collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (RUST_LOG가 있으면 무시)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 구간 전체 kline을 내려받아 CSV로 저장
    CollectOhlcv {
        /// 심볼 (예: BTCUSDT)
        #[arg(long)]
        symbol: String,

        /// 인터벌 토큰 (분 단위 숫자 또는 D, W, M)
        #[arg(long, default_value = "60")]
        interval: String,

        /// 시작 (YYYY-MM-DD 또는 "YYYY-MM-DD HH:MM:SS", UTC)
        #[arg(long)]
        from: String,

        /// 끝 (포함)
        #[arg(long)]
        to: String,

        /// 출력 CSV 경로 (기본: DATA_DIR/{SYMBOL}_{interval}_{from}_to_{to}.csv)
        #[arg(long)]
        output: Option<PathBuf>,

        /// 페이지당 캔들 수 (KLINE_PAGE_LIMIT 대체)
        #[arg(long)]
        limit: Option<u32>,

        /// 기존 출력 파일이 있으면 병합
        #[arg(long)]
        merge: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "trader_collector={},trader_exchange={}",
                    cli.log_level, cli.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = CollectorConfig::from_env()?;
    tracing::debug!(base_url = %config.bybit_base_url, data_dir = %config.data_dir.display(), "설정 로드 완료");

    match cli.command {
        Commands::CollectOhlcv {
            symbol,
            interval,
            from,
            to,
            output,
            limit,
            merge,
        } => {
            if let Some(limit) = limit {
                config.kline.page_limit = limit;
                config.kline.validate()?;
            }

            // 네트워크 요청 전에 인자 검증
            let request = FetchRequest::from_tokens(&config.kline, &symbol, &interval, &from, &to)?;
            let output = output.unwrap_or_else(|| {
                modules::default_output_path(
                    &config.data_dir,
                    &request.symbol,
                    request.interval,
                    request.start_ms,
                    request.end_ms,
                )
            });

            let client = BybitClient::new(config.bybit_base_url.clone())?;
            let provider = BybitExchangeProvider::new(Arc::new(client));

            let outcome = match modules::fetch_klines(&provider, &request).await {
                Ok(outcome) => outcome,
                Err(CollectorError::RetryExhausted {
                    attempts,
                    last_error,
                    partial,
                }) => {
                    // 재시도 한도 초과여도 수집된 구간은 저장
                    if !partial.is_empty() {
                        let rows = save_candles(&output, partial, merge)?;
                        tracing::warn!(rows, output = %output.display(), "재시도 한도 초과, 부분 결과 저장");
                        println!("WARNING: partial range saved: {} rows -> {}", rows, output.display());
                    }
                    anyhow::bail!("재시도 한도 초과 ({}회 시도): {}", attempts, last_error);
                }
                Err(e) => return Err(e.into()),
            };

            if outcome.candles.is_empty() {
                tracing::warn!(reason = ?outcome.stop_reason, "수집된 캔들이 없어 파일을 쓰지 않습니다");
                println!("No candles collected ({:?})", outcome.stop_reason);
                return Ok(());
            }

            let rows = save_candles(&output, outcome.candles, merge)?;

            println!(
                "{} {} candles: {} rows -> {} (stop: {:?}, requests: {}, retries: {})",
                request.symbol,
                request.interval,
                rows,
                output.display(),
                outcome.stop_reason,
                outcome.stats.requests,
                outcome.stats.retries,
            );
            if !outcome.stop_reason.is_complete() {
                println!("WARNING: partial range, see logs for the stop reason");
            }
        }
    }

    Ok(())
}

/// 캔들 저장. `merge`이고 파일이 있으면 기존 행과 병합합니다.
fn save_candles(output: &Path, candles: Vec<Candle>, merge: bool) -> anyhow::Result<usize> {
    let candles = if merge && output.exists() {
        let existing = modules::read_candles(output)
            .with_context(|| format!("기존 파일 로드 실패: {}", output.display()))?;
        modules::merge_candles(existing, candles)
    } else {
        candles
    };
    Ok(modules::write_candles(output, &candles)?)
}
