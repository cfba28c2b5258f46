//! 백테스트 명령어.
//!
//! 캔들 CSV와 SVM 모델 아티팩트로 바 단위 백테스트를 실행합니다.
//!
//! # 사용 예시
//!
//! ```bash
//! # 기본 설정 (초기 현금 10000, 진입 250, 최대 25건, 수수료 0.1%)
//! trader backtest -d DATA/BTCUSDT_60m_20250101_to_20250519.csv \
//!     --model models/BTCUSDT_60m_Kernel-rbf_C-1.0_Gamma-0p01_model.json \
//!     --scaler models/BTCUSDT_60m_scaler.json
//!
//! # TOML 설정 파일 + 개별 덮어쓰기
//! trader backtest -d data.csv --model m.json --scaler s.json -c config/backtest.toml --trade-value 500
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::{info, warn};

use trader_analytics::backtest::{BacktestConfig, BacktestEngine, BacktestReport};
use trader_analytics::export::write_equity_curve;
use trader_analytics::features::{annotate_features, compute_features};
use trader_analytics::model::{model_tag, ClassifierDecision, ModelArtifacts};
use trader_collector::modules::read_candles;

/// 백테스트 CLI 설정
#[derive(Debug, Clone, Default)]
pub struct BacktestCliConfig {
    /// 캔들 CSV 경로
    pub data_path: PathBuf,
    /// 분류기 JSON 경로
    pub model_path: PathBuf,
    /// 스케일러 JSON 경로
    pub scaler_path: PathBuf,
    /// 백테스트 설정 TOML (옵션)
    pub config_path: Option<PathBuf>,
    /// 초기 현금 덮어쓰기
    pub initial_cash: Option<Decimal>,
    /// 진입 금액 덮어쓰기
    pub trade_value: Option<Decimal>,
    /// 최대 동시 거래 수 덮어쓰기
    pub max_open_trades: Option<usize>,
    /// 수수료 비율 덮어쓰기
    pub commission_fraction: Option<Decimal>,
    /// 가격 스케일 덮어쓰기
    pub units_per_share: Option<Decimal>,
    /// 종료 시 강제 청산
    pub close_open_at_end: bool,
    /// 워밍업 바도 시뮬레이션에 포함 (건너뜀으로 집계)
    pub include_warmup: bool,
    /// 결과 저장 디렉터리 (옵션)
    pub output_dir: Option<PathBuf>,
}

impl BacktestCliConfig {
    /// 설정 파일을 읽고 CLI 인자로 덮어쓴 뒤 검증합니다.
    pub fn resolve_engine_config(&self) -> Result<BacktestConfig> {
        let mut config = match &self.config_path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("설정 파일 읽기 실패: {}", path.display()))?;
                toml::from_str::<BacktestConfig>(&text)
                    .with_context(|| format!("설정 파일 파싱 실패: {}", path.display()))?
            }
            None => BacktestConfig::default(),
        };

        if let Some(v) = self.initial_cash {
            config.initial_cash = v;
        }
        if let Some(v) = self.trade_value {
            config.trade_value = v;
        }
        if let Some(v) = self.max_open_trades {
            config.max_open_trades = v;
        }
        if let Some(v) = self.commission_fraction {
            config.commission_fraction = v;
        }
        if let Some(v) = self.units_per_share {
            config.units_per_share = v;
        }
        if self.close_open_at_end {
            config.close_open_at_end = true;
        }

        config.validate()?;
        Ok(config)
    }
}

/// 저장된 결과 파일 경로.
#[derive(Debug, Clone)]
pub struct BacktestOutputs {
    pub report_path: PathBuf,
    pub equity_path: PathBuf,
}

/// 백테스트 실행
pub fn run_backtest(cli: &BacktestCliConfig) -> Result<(BacktestReport, Option<BacktestOutputs>)> {
    // 데이터 로드 전에 설정과 아티팩트부터 검증
    let config = cli.resolve_engine_config()?;
    let artifacts = ModelArtifacts::load(&cli.model_path, &cli.scaler_path)?;

    let candles = read_candles(&cli.data_path)
        .with_context(|| format!("캔들 로드 실패: {}", cli.data_path.display()))?;
    let bars = if cli.include_warmup {
        annotate_features(&candles)?
    } else {
        compute_features(&candles)?
    };
    if bars.is_empty() {
        warn!(candles = candles.len(), "피처가 정의된 바가 없습니다");
    }

    info!(
        data = %cli.data_path.display(),
        candles = candles.len(),
        bars = bars.len(),
        "백테스트 데이터 준비 완료"
    );

    let mut decision = ClassifierDecision::new(artifacts);
    let report = BacktestEngine::new(config).run(&bars, &mut decision)?;

    let outputs = match &cli.output_dir {
        Some(dir) => Some(save_outputs(&report, dir, &cli.data_path, &cli.model_path)?),
        None => None,
    };

    Ok((report, outputs))
}

/// 결과 파일 이름 접두사: `{캔들 파일명}_{모델 태그}`
pub fn output_stem(data_path: &Path, model_path: &Path) -> String {
    let data_stem = data_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    format!("{}_{}", data_stem, model_tag(model_path))
}

fn save_outputs(
    report: &BacktestReport,
    dir: &Path,
    data_path: &Path,
    model_path: &Path,
) -> Result<BacktestOutputs> {
    let stem = output_stem(data_path, model_path);
    let report_path = dir.join(format!("{}_backtest.json", stem));
    let equity_path = dir.join(format!("{}_equity.csv", stem));

    save_report(report, &report_path)?;
    write_equity_curve(&equity_path, &report.equity_curve)?;

    Ok(BacktestOutputs {
        report_path,
        equity_path,
    })
}

/// 리포트 저장. 확장자가 json이면 JSON, 아니면 텍스트 요약.
fn save_report(report: &BacktestReport, path: &Path) -> Result<()> {
    // 디렉토리 생성
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::to_string_pretty(report)?
    } else {
        report.summary()
    };

    fs::write(path, content)?;
    info!(path = %path.display(), "백테스트 리포트 저장");
    Ok(())
}
