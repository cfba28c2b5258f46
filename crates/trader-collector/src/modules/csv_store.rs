//! 캔들 CSV 저장소.
//!
//! 헤더: `timestamp_ms,open_time,open,high,low,close,volume`
//!
//! 가격/거래량은 정밀도 손실 없이 10진 문자열로 기록합니다.

use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use trader_core::time::date_tag;
use trader_core::{Candle, Interval};

use super::utils::{is_strictly_increasing, sort_dedup};
use crate::{CollectorError, Result};

/// CSV 한 행.
#[derive(Debug, Serialize, Deserialize)]
struct CandleRow {
    timestamp_ms: i64,
    open_time: String,
    #[serde(with = "rust_decimal::serde::str")]
    open: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    high: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    low: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    close: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    volume: Decimal,
}

impl From<&Candle> for CandleRow {
    fn from(c: &Candle) -> Self {
        Self {
            timestamp_ms: c.timestamp_ms,
            open_time: c.open_time(),
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
        }
    }
}

/// 캔들을 CSV로 저장. 상위 디렉터리가 없으면 생성합니다.
///
/// 기록한 행 수를 반환합니다.
pub fn write_candles(path: &Path, candles: &[Candle]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    for candle in candles {
        writer.serialize(CandleRow::from(candle))?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = candles.len(), "캔들 CSV 저장");
    Ok(candles.len())
}

/// CSV에서 캔들 로드.
///
/// 각 행의 OHLC 관계를 검증하고, 타임스탬프가 엄격한 오름차순이 아니면 실패합니다.
pub fn read_candles(path: &Path) -> Result<Vec<Candle>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut candles = Vec::new();

    for row in reader.deserialize::<CandleRow>() {
        let row = row?;
        candles.push(Candle::try_new(
            row.timestamp_ms,
            row.open,
            row.high,
            row.low,
            row.close,
            row.volume,
        )?);
    }

    if !is_strictly_increasing(&candles) {
        return Err(CollectorError::Data(format!(
            "{}: 타임스탬프가 정렬되지 않았거나 중복이 있습니다",
            path.display()
        )));
    }

    Ok(candles)
}

/// 두 캔들 시리즈 병합.
///
/// 같은 타임스탬프는 `existing` 쪽을 유지하며, 결과는 오름차순입니다.
/// 같은 입력으로 반복해도 결과가 같습니다.
pub fn merge_candles(existing: Vec<Candle>, incoming: Vec<Candle>) -> Vec<Candle> {
    let mut all = existing;
    all.extend(incoming);
    sort_dedup(all)
}

/// 기본 출력 경로.
///
/// `{data_dir}/{SYMBOL}_{interval}_{YYYYMMDD}_to_{YYYYMMDD}.csv`
/// (분 단위 인터벌은 `60m`처럼 `m`을 붙임)
pub fn default_output_path(
    data_dir: &Path,
    symbol: &str,
    interval: Interval,
    start_ms: i64,
    end_ms: i64,
) -> PathBuf {
    data_dir.join(format!(
        "{}_{}_{}_to_{}.csv",
        symbol.to_uppercase(),
        interval.file_tag(),
        date_tag(start_ms),
        date_tag(end_ms)
    ))
}
