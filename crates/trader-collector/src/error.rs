//! 에러 타입 정의.

use thiserror::Error;
use trader_core::{Candle, CoreError};
use trader_exchange::ExchangeError;

/// Collector 에러 타입
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 설정 에러 (잘못된 인터벌, 날짜, 한도 등). 네트워크 요청 전에 발생합니다.
    #[error("설정 오류: {0}")]
    Config(String),

    /// 재시도 대상이 아닌 거래소 에러 (인증 실패 등)
    #[error("거래소 오류: {0}")]
    Exchange(#[from] ExchangeError),

    /// 일시적 에러가 재시도 한도를 넘어 지속됨
    ///
    /// `partial`은 중단 전까지 수집된 캔들 (정렬/중복 제거/구간 필터링 완료).
    #[error("재시도 한도 초과 ({attempts}회 시도, 수집분 {}개): {last_error}", partial.len())]
    RetryExhausted {
        attempts: u32,
        last_error: ExchangeError,
        partial: Vec<Candle>,
    },

    /// 잘못된 캔들 데이터 (CSV 파일 등)
    #[error("데이터 오류: {0}")]
    Data(String),

    /// 파일 입출력 에러
    #[error("파일 입출력 오류: {0}")]
    Io(#[from] std::io::Error),

    /// CSV 직렬화 에러
    #[error("CSV 오류: {0}")]
    Csv(#[from] csv::Error),
}

impl From<CoreError> for CollectorError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidCandle { .. } => Self::Data(err.to_string()),
            CoreError::InvalidInterval(_) | CoreError::InvalidDate(_) => {
                Self::Config(err.to_string())
            }
        }
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
