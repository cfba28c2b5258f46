//! 거래소 에러 타입.
//!
//! 재시도 정책([`crate::retry`])은 [`ExchangeError::is_retryable`]과
//! [`ExchangeError::is_fatal`] 분류에 따라 동작합니다.

use thiserror::Error;

/// 거래소 요청 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// 전송 계층 실패 (연결, 타임아웃, 5xx)
    #[error("네트워크 오류: {0}")]
    NetworkError(String),

    /// 요청 한도 초과
    #[error("요청 한도 초과: {message}")]
    RateLimited {
        message: String,
        /// 거래소가 알려준 대기 시간 (없으면 재시도 정책 기본값 사용)
        retry_after_ms: Option<u64>,
    },

    /// 거래소가 반환한 비정상 응답 코드
    #[error("API 오류 (code={code}): {message}")]
    ApiError { code: i64, message: String },

    /// 응답 형식 오류
    #[error("응답 파싱 오류: {0}")]
    ParseError(String),

    /// 인증 실패 (키, 서명, 권한)
    #[error("인증 실패: {0}")]
    Unauthorized(String),

    /// 서명 요청에 필요한 자격 증명 없음
    #[error("자격 증명 없음: {0}")]
    MissingCredentials(String),
}

impl ExchangeError {
    /// 재시도로 해결될 수 있는 일시적 에러인지 여부.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError(_) | Self::RateLimited { .. })
    }

    /// 재시도해도 절대 성공할 수 없는 에러인지 여부.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::MissingCredentials(_))
    }

    /// 거래소가 지정한 재시도 대기 시간 (밀리초).
    pub fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let network = ExchangeError::NetworkError("timeout".into());
        assert!(network.is_retryable());
        assert!(!network.is_fatal());

        let limited = ExchangeError::RateLimited {
            message: "Too many visits".into(),
            retry_after_ms: Some(1500),
        };
        assert!(limited.is_retryable());
        assert_eq!(limited.retry_delay_ms(), Some(1500));

        let api = ExchangeError::ApiError {
            code: 10001,
            message: "params error".into(),
        };
        assert!(!api.is_retryable());
        assert!(!api.is_fatal());

        assert!(ExchangeError::Unauthorized("bad sign".into()).is_fatal());
        assert!(!ExchangeError::ParseError("x".into()).is_retryable());
    }
}
