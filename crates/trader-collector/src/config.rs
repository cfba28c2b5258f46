//! 환경변수 기반 설정 모듈.

use std::path::PathBuf;
use std::time::Duration;

use trader_exchange::connector::bybit::DEFAULT_BASE_URL;
use trader_exchange::RetryConfig;

use crate::{CollectorError, Result};

/// Bybit kline 페이지 최대 크기.
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Bybit REST 엔드포인트
    pub bybit_base_url: String,
    /// kline 수집 설정
    pub kline: KlineFetchConfig,
    /// CSV 저장 디렉터리
    pub data_dir: PathBuf,
}

/// kline 수집 설정
#[derive(Debug, Clone, PartialEq)]
pub struct KlineFetchConfig {
    /// 상품 카테고리 (기본 "linear")
    pub category: String,
    /// 페이지당 캔들 수 (1..=1000)
    pub page_limit: u32,
    /// 성공한 페이지 사이 대기 (밀리초)
    pub request_delay_ms: u64,
    /// 일시적 에러 후 고정 대기 (초)
    pub retry_delay_secs: u64,
    /// 요청당 최대 재시도 횟수
    pub max_retries: u32,
}

impl Default for KlineFetchConfig {
    fn default() -> Self {
        Self {
            category: "linear".to_string(),
            page_limit: MAX_PAGE_LIMIT,
            request_delay_ms: 200,
            retry_delay_secs: 60,
            max_retries: 30,
        }
    }
}

impl KlineFetchConfig {
    /// 페이지 사이 딜레이를 Duration으로 반환
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// 고정 간격 재시도 정책
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::fixed(Duration::from_secs(self.retry_delay_secs), self.max_retries)
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.category.trim().is_empty() {
            return Err(CollectorError::Config("category가 비어 있습니다".to_string()));
        }
        if self.page_limit == 0 || self.page_limit > MAX_PAGE_LIMIT {
            return Err(CollectorError::Config(format!(
                "page_limit는 1..={} 범위여야 합니다: {}",
                MAX_PAGE_LIMIT, self.page_limit
            )));
        }
        Ok(())
    }
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    ///
    /// `.env` 파일이 있으면 먼저 읽습니다.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = KlineFetchConfig::default();
        let kline = KlineFetchConfig {
            category: env_var_or("KLINE_CATEGORY", &defaults.category),
            page_limit: env_var_parse("KLINE_PAGE_LIMIT", defaults.page_limit),
            request_delay_ms: env_var_parse("KLINE_REQUEST_DELAY_MS", defaults.request_delay_ms),
            retry_delay_secs: env_var_parse("KLINE_RETRY_DELAY_SECS", defaults.retry_delay_secs),
            max_retries: env_var_parse("KLINE_MAX_RETRIES", defaults.max_retries),
        };
        kline.validate()?;

        Ok(Self {
            bybit_base_url: env_var_or("BYBIT_BASE_URL", DEFAULT_BASE_URL),
            kline,
            data_dir: PathBuf::from(env_var_or("DATA_DIR", "DATA")),
        })
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 환경변수 문자열 (비어 있으면 기본값)
fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
