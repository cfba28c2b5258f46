//! 거래소 API 재시도 유틸리티.
//!
//! 네트워크 오류, Rate Limit 등 일시적인 오류에 대해 자동 재시도를 수행합니다.
//! 재시도 횟수는 항상 [`RetryConfig::max_retries`]로 제한됩니다.
//!
//! # 예시
//!
//! ```rust,ignore
//! use trader_exchange::retry::{RetryConfig, with_retry};
//!
//! let config = RetryConfig::fixed(Duration::from_secs(60), 30);
//! let page = with_retry(&config, || async {
//!     client.get_klines(&request).await
//! }).await?;
//! ```

use std::{future::Future, time::Duration};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ExchangeError;

/// 재시도 설정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// 최대 재시도 횟수 (초기 시도 제외).
    pub max_retries: u32,
    /// 기본 대기 시간 (에러에 지정된 대기 시간이 없을 때 사용).
    pub base_delay: Duration,
    /// 최대 대기 시간.
    pub max_delay: Duration,
    /// 지수 백오프 사용 여부.
    pub use_exponential_backoff: bool,
    /// 백오프 배수 (지수 백오프 시 사용).
    pub backoff_multiplier: f64,
    /// 재시도 시 지터(±25%) 추가 여부.
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(60),
            use_exponential_backoff: true,
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl RetryConfig {
    /// 고정 간격 재시도 (백오프/지터 없음).
    ///
    /// 캔들 수집기의 기본 정책입니다 (60초 간격).
    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: delay,
            max_delay: delay,
            use_exponential_backoff: false,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// 빠른 재시도 설정 (짧은 지연, 적은 재시도).
    pub fn fast() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            ..Default::default()
        }
    }

    /// 재시도 없음 (단일 시도).
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// 최대 재시도 횟수 설정.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// 대기 시간 계산.
    pub fn calculate_delay(&self, attempt: u32, error: &ExchangeError) -> Duration {
        // 에러에 지정된 대기 시간이 있으면 우선 사용
        let base = error
            .retry_delay_ms()
            .map(Duration::from_millis)
            .unwrap_or(self.base_delay);

        let delay = if self.use_exponential_backoff && attempt > 0 {
            let multiplier = self.backoff_multiplier.powi(attempt as i32);
            Duration::from_secs_f64(base.as_secs_f64() * multiplier)
        } else {
            base
        };

        let delay = delay.min(self.max_delay.max(base));

        if self.add_jitter {
            let jitter_range = delay.as_millis() as f64 * 0.25;
            let jitter = rand::thread_rng().gen_range(-1.0..=1.0) * jitter_range;
            Duration::from_millis((delay.as_millis() as f64 + jitter).max(0.0) as u64)
        } else {
            delay
        }
    }
}

/// 재시도 결과 통계.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryStats {
    /// 총 시도 횟수.
    pub total_attempts: u32,
    /// 총 대기 시간.
    pub total_delay: Duration,
    /// 성공 여부.
    pub success: bool,
}

impl RetryStats {
    /// 재시도 횟수 (초기 시도 제외).
    pub fn retries(&self) -> u32 {
        self.total_attempts.saturating_sub(1)
    }
}

/// 재시도가 포함된 비동기 작업 실행.
///
/// 치명적 에러와 재시도 불가능한 에러는 즉시 반환하고,
/// 일시적 에러는 `max_retries`까지 재시도한 뒤 마지막 에러를 반환합니다.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: F) -> Result<T, ExchangeError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ExchangeError>>,
{
    with_retry_stats(config, operation).await.0
}

/// 재시도가 포함된 비동기 작업 실행 (통계 포함).
///
/// 성공/실패와 관계없이 시도 횟수와 총 대기 시간을 함께 반환합니다.
/// 실패 시 마지막 에러가 `is_retryable()`이면 재시도 한도 소진을 의미합니다.
pub async fn with_retry_stats<T, F, Fut>(
    config: &RetryConfig,
    operation: F,
) -> (Result<T, ExchangeError>, RetryStats)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ExchangeError>>,
{
    let mut attempt = 0;
    let mut total_delay = Duration::ZERO;

    loop {
        let stats = |success| RetryStats {
            total_attempts: attempt + 1,
            total_delay,
            success,
        };

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        attempts = attempt + 1,
                        total_delay_ms = total_delay.as_millis() as u64,
                        "재시도 후 성공"
                    );
                }
                return (Ok(result), stats(true));
            }
            Err(e) => {
                if e.is_fatal() {
                    warn!(error = %e, "치명적 에러 발생, 재시도 없이 실패 반환");
                    return (Err(e), stats(false));
                }

                if !e.is_retryable() {
                    debug!(error = %e, "재시도 불가능한 에러, 즉시 실패 반환");
                    return (Err(e), stats(false));
                }

                if attempt >= config.max_retries {
                    warn!(
                        error = %e,
                        attempts = attempt + 1,
                        max_retries = config.max_retries,
                        "최대 재시도 횟수 초과"
                    );
                    return (Err(e), stats(false));
                }

                let delay = config.calculate_delay(attempt, &e);
                total_delay += delay;

                warn!(
                    error = %e,
                    attempt = attempt + 1,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "재시도 대기 중"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    use super::*;

    #[tokio::test]
    async fn test_immediate_success() {
        let config = RetryConfig::default();
        let result = with_retry(&config, || async { Ok::<_, ExchangeError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_on_rate_limit() {
        let config = RetryConfig::fixed(Duration::from_secs(60), 5);

        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let (result, stats) = with_retry_stats(&config, || {
            let counter = counter_clone.clone();
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err(ExchangeError::RateLimited {
                        message: "Too many visits".to_string(),
                        retry_after_ms: None,
                    })
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(stats.retries(), 2);
        assert_eq!(stats.total_delay, Duration::from_secs(120));
        assert!(stats.success);
    }

    #[tokio::test]
    async fn test_no_retry_on_fatal_error() {
        let config = RetryConfig::default();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&config, || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(ExchangeError::Unauthorized("invalid sign".to_string()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_on_api_error() {
        let config = RetryConfig::default();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&config, || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(ExchangeError::ApiError {
                    code: 10001,
                    message: "params error".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(ExchangeError::ApiError { code: 10001, .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_retries_exceeded() {
        let config = RetryConfig::fixed(Duration::from_millis(10), 2);

        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let (result, stats) = with_retry_stats(&config, || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(ExchangeError::NetworkError("항상 실패".to_string()))
            }
        })
        .await;

        assert!(result.unwrap_err().is_retryable());
        // 초기 1회 + 재시도 2회
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(stats.total_attempts, 3);
        assert!(!stats.success);
    }

    #[test]
    fn test_delay_calculation() {
        let err = ExchangeError::NetworkError("x".into());

        let fixed = RetryConfig::fixed(Duration::from_secs(60), 30);
        assert_eq!(fixed.calculate_delay(0, &err), Duration::from_secs(60));
        assert_eq!(fixed.calculate_delay(10, &err), Duration::from_secs(60));

        let exp = RetryConfig {
            add_jitter: false,
            ..Default::default()
        };
        assert_eq!(exp.calculate_delay(0, &err), Duration::from_secs(1));
        assert_eq!(exp.calculate_delay(2, &err), Duration::from_secs(4));
        assert_eq!(exp.calculate_delay(10, &err), Duration::from_secs(60));

        let limited = ExchangeError::RateLimited {
            message: "limit".into(),
            retry_after_ms: Some(250),
        };
        assert_eq!(fixed.calculate_delay(0, &limited), Duration::from_millis(250));
    }

    #[test]
    fn test_jitter_bounds() {
        let config = RetryConfig {
            use_exponential_backoff: false,
            ..Default::default()
        };
        let err = ExchangeError::NetworkError("x".into());
        for _ in 0..50 {
            let delay = config.calculate_delay(0, &err).as_millis();
            assert!((750..=1250).contains(&delay));
        }
    }

    #[test]
    fn test_config_presets() {
        let fast = RetryConfig::fast();
        assert_eq!(fast.max_retries, 2);
        assert_eq!(fast.base_delay, Duration::from_millis(100));

        assert_eq!(RetryConfig::no_retry().max_retries, 0);
        assert_eq!(RetryConfig::fixed(Duration::from_secs(1), 4).with_max_retries(9).max_retries, 9);
    }
}
