//! 수집 통계 구조체.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// kline 수집 통계
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStats {
    /// 총 HTTP 요청 수 (재시도 포함)
    pub requests: u32,
    /// 재시도 횟수
    pub retries: u32,
    /// 성공적으로 수신한 페이지 수
    pub pages: u32,
    /// 최종 결과에 포함된 캔들 수
    pub candles_kept: usize,
    /// 재시도 대기 총합
    #[serde(skip)]
    pub backoff: Duration,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl FetchStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            requests = self.requests,
            retries = self.retries,
            pages = self.pages,
            candles = self.candles_kept,
            backoff = format!("{:.1}s", self.backoff.as_secs_f64()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );
    }
}
