//! 학습 데이터셋 내보내기 명령어.
//!
//! 캔들 CSV에서 피처와 방향 레이블을 계산해 외부 학습기용 CSV로 저장합니다.
//!
//! ```bash
//! trader features -d DATA/BTCUSDT_60m_20250101_to_20250519.csv -o DATA/train.csv --n-future 1
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;

use trader_analytics::export::write_training_dataset;
use trader_analytics::features::{annotate_features, label_next_bar_direction};
use trader_collector::modules::read_candles;

/// 피처 내보내기 설정
#[derive(Debug, Clone)]
pub struct FeaturesCliConfig {
    /// 입력 캔들 CSV
    pub data_path: PathBuf,
    /// 출력 CSV
    pub output_path: PathBuf,
    /// 레이블 기준 미래 바 수
    pub n_future: usize,
}

/// 데이터셋을 저장하고 기록한 행 수를 반환합니다.
pub fn run_export_features(config: &FeaturesCliConfig) -> Result<usize> {
    if config.n_future == 0 {
        bail!("n_future는 1 이상이어야 합니다");
    }

    let candles = read_candles(&config.data_path)
        .with_context(|| format!("캔들 로드 실패: {}", config.data_path.display()))?;
    let bars = annotate_features(&candles)?;
    let labels = label_next_bar_direction(&bars, config.n_future);

    let rows = write_training_dataset(&config.output_path, &bars, &labels)?;
    info!(
        candles = candles.len(),
        rows,
        n_future = config.n_future,
        "학습 데이터셋 생성 완료"
    );
    Ok(rows)
}
