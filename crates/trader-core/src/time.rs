//! UTC 시간 변환 유틸리티.
//!
//! 모든 타임스탬프는 UTC epoch 밀리초(`i64`)로 다룹니다.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::{CoreError, CoreResult};

/// CSV `open_time` 컬럼 및 로그에 사용하는 포맷.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 날짜 문자열을 UTC 밀리초로 변환.
///
/// `YYYY-MM-DD HH:MM:SS` 와 `YYYY-MM-DD` (자정) 두 형식을 허용합니다.
pub fn parse_datetime_to_millis(value: &str) -> CoreResult<i64> {
    let value = value.trim();

    if let Ok(dt) = NaiveDateTime::parse_from_str(value, DATETIME_FORMAT) {
        return Ok(dt.and_utc().timestamp_millis());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
        .ok_or_else(|| CoreError::InvalidDate(value.to_string()))
}

/// UTC 밀리초를 `YYYY-MM-DD HH:MM:SS` 문자열로 변환.
///
/// 표현 범위를 벗어나면 밀리초 값을 그대로 문자열로 반환합니다.
pub fn format_millis(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format(DATETIME_FORMAT).to_string())
        .unwrap_or_else(|| ms.to_string())
}

/// 파일명용 날짜 태그 (YYYYMMDD).
pub fn date_tag(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y%m%d").to_string())
        .unwrap_or_else(|| ms.to_string())
}
