//! CSV 내보내기.
//!
//! - 학습 데이터셋: `timestamp_ms,open_time,<피처 10개>,target`
//! - 자산 곡선: `timestamp_ms,open_time,equity,buy_hold_equity`

use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use trader_core::time::format_millis;

use crate::features::{Bar, FEATURE_NAMES};
use crate::performance::EquityPoint;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("파일 I/O 오류: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV 오류: {0}")]
    Csv(#[from] csv::Error),

    #[error("레이블 수({labels})가 바 수({bars})와 다릅니다")]
    LengthMismatch { bars: usize, labels: usize },
}

fn ensure_parent(path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// 학습 데이터셋 저장.
///
/// 피처가 모두 정의되고 레이블이 있는 바만 기록하며, 기록한 행 수를 반환합니다.
pub fn write_training_dataset(
    path: &Path,
    bars: &[Bar],
    labels: &[Option<u8>],
) -> Result<usize, ExportError> {
    if bars.len() != labels.len() {
        return Err(ExportError::LengthMismatch {
            bars: bars.len(),
            labels: labels.len(),
        });
    }
    ensure_parent(path)?;

    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec!["timestamp_ms", "open_time"];
    header.extend(FEATURE_NAMES);
    header.push("target");
    writer.write_record(&header)?;

    let mut rows = 0;
    for (bar, label) in bars.iter().zip(labels) {
        let (Some(features), Some(label)) = (bar.feature_vector(), label) else {
            continue;
        };

        let mut record = Vec::with_capacity(header.len());
        record.push(bar.timestamp_ms().to_string());
        record.push(format_millis(bar.timestamp_ms()));
        record.extend(features.iter().map(|v| v.to_string()));
        record.push(label.to_string());
        writer.write_record(&record)?;
        rows += 1;
    }
    writer.flush()?;

    info!(path = %path.display(), rows, "학습 데이터셋 저장");
    Ok(rows)
}

/// 자산 곡선 저장.
pub fn write_equity_curve(path: &Path, curve: &[EquityPoint]) -> Result<usize, ExportError> {
    ensure_parent(path)?;

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["timestamp_ms", "open_time", "equity", "buy_hold_equity"])?;
    for point in curve {
        writer.write_record([
            point.timestamp_ms.to_string(),
            format_millis(point.timestamp_ms),
            point.equity.round_dp(8).normalize().to_string(),
            point.buy_hold_equity.round_dp(8).normalize().to_string(),
        ])?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = curve.len(), "자산 곡선 저장");
    Ok(curve.len())
}
