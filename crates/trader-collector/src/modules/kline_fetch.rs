//! kline 페이지네이션 수집 모듈.
//!
//! 요청 구간 `[start_ms, end_ms]`를 커서 기반으로 순회합니다.
//!
//! # 루프
//!
//! 1. 커서 위치에서 한 페이지 요청 (`limit = page_limit`)
//! 2. 네트워크 오류/Rate Limit → 고정 대기 후 같은 요청 재시도 (최대 `max_retries`)
//! 3. 그 외 거래소 오류 → 중단, 수집분 반환 ([`StopReason::ApiError`])
//! 4. 응답 형식 오류 → 중단, 수집분 반환 ([`StopReason::MalformedPayload`])
//! 5. 페이지를 시간순으로 정렬하고 구간 내 캔들만 보관
//! 6. 종료 판정 후 커서를 `마지막 캔들 + interval`로 전진
//!
//! 꽉 찬 페이지가 커서 이후 캔들을 하나도 담고 있지 않거나 커서가 전진하지 않으면
//! 무한 루프 방지를 위해 중단합니다 ([`StopReason::StalledCursor`]).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{error, info, warn};

use trader_core::time::{format_millis, parse_datetime_to_millis};
use trader_core::{Candle, Interval};
use trader_exchange::{with_retry_stats, ExchangeError, KlinePageRequest, KlineSource, RetryConfig};

use super::utils::{clip_range, sort_dedup};
use crate::{CollectorError, FetchStats, KlineFetchConfig, Result};

// =============================================================================
// 요청 / 결과 타입
// =============================================================================

/// 수집 요청.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub symbol: String,
    pub category: String,
    pub interval: Interval,
    /// 구간 시작 (UTC epoch ms, 포함)
    pub start_ms: i64,
    /// 구간 끝 (UTC epoch ms, 포함)
    pub end_ms: i64,
    pub page_limit: u32,
    /// 성공한 페이지 사이 대기
    pub request_delay: Duration,
    pub retry: RetryConfig,
}

impl FetchRequest {
    /// 기본 수집 설정으로 요청 생성.
    pub fn new(symbol: impl Into<String>, interval: Interval, start_ms: i64, end_ms: i64) -> Self {
        Self::from_config(&KlineFetchConfig::default(), symbol, interval, start_ms, end_ms)
    }

    /// 수집 설정으로 요청 생성.
    pub fn from_config(
        config: &KlineFetchConfig,
        symbol: impl Into<String>,
        interval: Interval,
        start_ms: i64,
        end_ms: i64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            category: config.category.clone(),
            interval,
            start_ms,
            end_ms,
            page_limit: config.page_limit,
            request_delay: config.request_delay(),
            retry: config.retry_config(),
        }
    }

    /// 문자열 인자(인터벌 토큰, 날짜)를 파싱하여 요청 생성.
    ///
    /// 잘못된 토큰이나 날짜는 [`CollectorError::Config`]로 즉시 실패합니다.
    pub fn from_tokens(
        config: &KlineFetchConfig,
        symbol: &str,
        interval: &str,
        from: &str,
        to: &str,
    ) -> Result<Self> {
        let interval: Interval = interval.parse()?;
        let start_ms = parse_datetime_to_millis(from)?;
        let end_ms = parse_datetime_to_millis(to)?;

        let request = Self::from_config(config, symbol.trim().to_uppercase(), interval, start_ms, end_ms);
        request.validate()?;
        Ok(request)
    }

    /// 요청 검증.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() {
            return Err(CollectorError::Config("symbol이 비어 있습니다".to_string()));
        }
        if self.start_ms > self.end_ms {
            return Err(CollectorError::Config(format!(
                "시작 시각이 종료 시각보다 늦습니다: {} > {}",
                format_millis(self.start_ms),
                format_millis(self.end_ms)
            )));
        }
        if self.page_limit == 0 {
            return Err(CollectorError::Config("page_limit는 0보다 커야 합니다".to_string()));
        }
        Ok(())
    }
}

/// 수집 종료 사유.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// 마지막 캔들이 종료 시각에 도달
    RangeCovered,
    /// 거래소에 더 이상 데이터 없음 (빈 페이지 또는 짧은 페이지)
    Exhausted,
    /// 거래소가 요청을 거부
    ApiError { code: i64, message: String },
    /// 응답 형식 오류
    MalformedPayload(String),
    /// 커서가 전진하지 않음
    StalledCursor { cursor_ms: i64 },
}

impl StopReason {
    /// 정상 종료 여부.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::RangeCovered | Self::Exhausted)
    }
}

/// 수집 결과.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// 정렬/중복 제거/구간 필터링된 캔들
    pub candles: Vec<Candle>,
    pub stop_reason: StopReason,
    pub stats: FetchStats,
}

impl FetchOutcome {
    /// 정상 종료 여부 (부분 결과가 아님).
    pub fn is_complete(&self) -> bool {
        self.stop_reason.is_complete()
    }
}

// =============================================================================
// 수집 루프
// =============================================================================

/// 요청 구간의 캔들을 모두 수집합니다.
///
/// 재시도 한도를 넘긴 일시적 에러는 [`CollectorError::RetryExhausted`]로 반환하며
/// 그때까지의 수집분은 에러의 `partial`에 담깁니다.
/// 거래소 거부나 형식 오류는 수집분과 함께 종료 사유로 반환합니다.
pub async fn fetch_klines<S>(source: &S, request: &FetchRequest) -> Result<FetchOutcome>
where
    S: KlineSource + ?Sized,
{
    request.validate()?;

    let started = Instant::now();
    let interval_ms = request.interval.as_millis();
    let mut stats = FetchStats::new();
    let mut collected: Vec<Candle> = Vec::new();
    let mut cursor = request.start_ms;

    info!(
        symbol = %request.symbol,
        interval = %request.interval,
        start = %format_millis(request.start_ms),
        end = %format_millis(request.end_ms),
        "kline 수집 시작"
    );

    let stop_reason = loop {
        let page_request = KlinePageRequest {
            category: request.category.clone(),
            symbol: request.symbol.clone(),
            interval: request.interval,
            start_ms: cursor,
            limit: request.page_limit,
        };

        let (result, retry_stats) =
            with_retry_stats(&request.retry, || source.fetch_kline_page(&page_request)).await;

        stats.requests += retry_stats.total_attempts;
        stats.retries += retry_stats.retries();
        stats.backoff += retry_stats.total_delay;

        let mut page = match result {
            Ok(page) => page,
            Err(e) if e.is_retryable() => {
                error!(
                    cursor = %format_millis(cursor),
                    attempts = retry_stats.total_attempts,
                    error = %e,
                    "재시도 한도 초과, 수집 중단"
                );
                return Err(CollectorError::RetryExhausted {
                    attempts: retry_stats.total_attempts,
                    last_error: e,
                    partial: clip_range(sort_dedup(collected), request.start_ms, request.end_ms),
                });
            }
            Err(ExchangeError::ApiError { code, message }) => {
                error!(code, message = %message, cursor = %format_millis(cursor), "API 오류로 수집 중단");
                break StopReason::ApiError { code, message };
            }
            Err(ExchangeError::ParseError(message)) => {
                error!(message = %message, cursor = %format_millis(cursor), "응답 형식 오류로 수집 중단");
                break StopReason::MalformedPayload(message);
            }
            Err(e) => return Err(e.into()),
        };

        stats.pages += 1;

        if page.is_empty() {
            info!(cursor = %format_millis(cursor), "빈 페이지, 데이터 끝");
            break StopReason::Exhausted;
        }

        let page_len = page.len();
        page.sort_by_key(|c| c.timestamp_ms);
        let last_ts = page[page_len - 1].timestamp_ms;

        for candle in page {
            if candle.timestamp_ms > request.end_ms {
                break;
            }
            if candle.timestamp_ms >= request.start_ms {
                collected.push(candle);
            }
        }

        info!(
            cursor = %format_millis(cursor),
            page_size = page_len,
            last = %format_millis(last_ts),
            collected = collected.len(),
            "페이지 수신"
        );

        if last_ts >= request.end_ms {
            break StopReason::RangeCovered;
        }
        if page_len < request.page_limit as usize {
            break StopReason::Exhausted;
        }
        if last_ts <= cursor {
            warn!(
                cursor = %format_millis(cursor),
                last = %format_millis(last_ts),
                page_size = page_len,
                "꽉 찬 페이지에 커서 이후 캔들이 없음, 무한 루프 방지를 위해 중단"
            );
            break StopReason::StalledCursor { cursor_ms: cursor };
        }

        let next_cursor = last_ts.saturating_add(interval_ms);
        if next_cursor <= cursor {
            warn!(
                cursor = %format_millis(cursor),
                next_cursor = %format_millis(next_cursor),
                "커서가 전진하지 않음, 무한 루프 방지를 위해 중단"
            );
            break StopReason::StalledCursor { cursor_ms: cursor };
        }
        cursor = next_cursor;

        if !request.request_delay.is_zero() {
            tokio::time::sleep(request.request_delay).await;
        }
    };

    let candles = clip_range(sort_dedup(collected), request.start_ms, request.end_ms);
    stats.candles_kept = candles.len();
    stats.elapsed = started.elapsed();
    stats.log_summary(&request.symbol);

    if !stop_reason.is_complete() {
        warn!(reason = ?stop_reason, candles = candles.len(), "부분 결과 반환");
    }

    Ok(FetchOutcome {
        candles,
        stop_reason,
        stats,
    })
}
