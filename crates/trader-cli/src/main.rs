//! 트레이딩 봇 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 학습 데이터셋 생성
//! trader features -d DATA/BTCUSDT_60m_20250101_to_20250519.csv -o DATA/train.csv
//!
//! # SVM 모델 백테스트
//! trader backtest -d DATA/BTCUSDT_60m_20250101_to_20250519.csv \
//!     --model models/model.json --scaler models/scaler.json -o backtest_results
//!
//! # Bybit 계좌
//! trader positions
//! trader close-positions --keep BTC,ETH
//! trader balances
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{
    account::{run_balances, run_close_positions, run_positions},
    backtest::{run_backtest, BacktestCliConfig},
    features::{run_export_features, FeaturesCliConfig},
};

#[derive(Parser)]
#[command(name = "trader")]
#[command(about = "Trading bot CLI - 피처 생성, SVM 백테스트, Bybit 계좌 도구", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (RUST_LOG가 있으면 무시)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 캔들 CSV → 학습 데이터셋 CSV (피처 + 방향 레이블)
    Features {
        /// 입력 캔들 CSV
        #[arg(short, long)]
        data: PathBuf,

        /// 출력 CSV 경로
        #[arg(short, long)]
        output: PathBuf,

        /// 레이블 기준 미래 바 수
        #[arg(long, default_value = "1")]
        n_future: usize,
    },

    /// SVM 모델로 바 단위 백테스트
    Backtest {
        /// 입력 캔들 CSV
        #[arg(short, long)]
        data: PathBuf,

        /// 분류기 JSON
        #[arg(long)]
        model: PathBuf,

        /// 스케일러 JSON
        #[arg(long)]
        scaler: PathBuf,

        /// 백테스트 설정 TOML
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// 초기 현금
        #[arg(long)]
        initial_cash: Option<Decimal>,

        /// 진입 1회당 금액
        #[arg(long)]
        trade_value: Option<Decimal>,

        /// 최대 동시 거래 수
        #[arg(long)]
        max_open_trades: Option<usize>,

        /// 수수료 비율 (0.001 = 0.1%)
        #[arg(long)]
        commission: Option<Decimal>,

        /// 1주당 기초자산 수량 (예: 0.00001)
        #[arg(long)]
        units_per_share: Option<Decimal>,

        /// 마지막 바에서 미청산 포지션 강제 청산
        #[arg(long)]
        close_at_end: bool,

        /// 워밍업 바도 시뮬레이션 (건너뜀으로 집계)
        #[arg(long)]
        include_warmup: bool,

        /// 결과(JSON 리포트, 자산 곡선 CSV) 저장 디렉터리
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 열린 포지션 조회
    Positions {
        /// 정산 코인
        #[arg(long, default_value = "USDT")]
        settle_coin: String,
    },

    /// 보호 목록을 제외한 모든 포지션 청산
    ClosePositions {
        /// 청산하지 않을 심볼 토큰 (쉼표 구분, 부분 일치)
        #[arg(long, value_delimiter = ',')]
        keep: Vec<String>,

        /// 정산 코인
        #[arg(long, default_value = "USDT")]
        settle_coin: String,

        /// 청산 주문 사이 대기 (ms)
        #[arg(long, default_value = "500")]
        delay_ms: u64,
    },

    /// 지갑 잔고 조회
    Balances,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (없어도 에러 안남)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "trader={lvl},trader_cli={lvl},trader_analytics={lvl},trader_collector={lvl},trader_exchange={lvl}",
                    lvl = cli.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Features {
            data,
            output,
            n_future,
        } => {
            let config = FeaturesCliConfig {
                data_path: data,
                output_path: output,
                n_future,
            };
            let rows = run_export_features(&config)?;
            println!(
                "\n📁 학습 데이터셋 저장됨: {} ({} rows)",
                config.output_path.display(),
                rows
            );
        }

        Commands::Backtest {
            data,
            model,
            scaler,
            config,
            initial_cash,
            trade_value,
            max_open_trades,
            commission,
            units_per_share,
            close_at_end,
            include_warmup,
            output,
        } => {
            let backtest_config = BacktestCliConfig {
                data_path: data,
                model_path: model,
                scaler_path: scaler,
                config_path: config,
                initial_cash,
                trade_value,
                max_open_trades,
                commission_fraction: commission,
                units_per_share,
                close_open_at_end: close_at_end,
                include_warmup,
                output_dir: output,
            };

            println!("\n📊 백테스트 실행 중...");
            println!("데이터: {}", backtest_config.data_path.display());
            println!("모델: {}", backtest_config.model_path.display());

            match run_backtest(&backtest_config) {
                Ok((report, outputs)) => {
                    info!("✅ Backtest completed successfully");
                    println!("\n{}", report.summary());
                    if let Some(out) = outputs {
                        println!("\n📁 결과 저장됨: {}", out.report_path.display());
                        println!("📁 자산 곡선: {}", out.equity_path.display());
                    }
                }
                Err(e) => {
                    error!("Backtest failed: {:#}", e);
                    return Err(e);
                }
            }
        }

        Commands::Positions { settle_coin } => {
            run_positions(&settle_coin).await?;
        }

        Commands::ClosePositions {
            keep,
            settle_coin,
            delay_ms,
        } => {
            let keep: Vec<String> = keep
                .into_iter()
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
            let summary =
                run_close_positions(&settle_coin, &keep, Duration::from_millis(delay_ms)).await?;
            if !summary.is_clean() {
                anyhow::bail!("{}개 포지션 청산 실패", summary.failed.len());
            }
        }

        Commands::Balances => {
            run_balances().await?;
        }
    }

    Ok(())
}
